// SPDX-License-Identifier: GPL-3.0-or-later

/// Splits the argument list of a system call on commas.
///
/// Commas inside square brackets, parentheses, braces or double quotes do
/// not split. Only one group is tracked at a time: while a group is open,
/// other opening characters are ignored and the first closing character of
/// the open kind terminates it. Each segment is trimmed, and the last
/// segment is always present (an empty input gives one empty segment).
///
/// ```
/// use adapter::trace::split_arguments;
///
/// assert_eq!(
///     split_arguments(r#"AT_FDCWD, "s1.c, s2.c", O_RDONLY|O_NOCTTY"#),
///     vec!["AT_FDCWD", r#""s1.c, s2.c""#, "O_RDONLY|O_NOCTTY"],
/// );
/// ```
pub fn split_arguments(text: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut open: Option<char> = None;
    let mut start = 0;

    for (index, character) in text.char_indices() {
        match open {
            None => match character {
                '[' | '(' | '{' | '"' => open = Some(character),
                ',' => {
                    result.push(text[start..index].trim().to_string());
                    start = index + character.len_utf8();
                }
                _ => {}
            },
            Some(opener) if character == closer(opener) => open = None,
            Some(_) => {}
        }
    }
    result.push(text[start..].trim().to_string());
    result
}

fn closer(opener: char) -> char {
    match opener {
        '[' => ']',
        '(' => ')',
        '{' => '}',
        _ => '"',
    }
}
