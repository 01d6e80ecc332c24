//! Plain text out of RTF source
//!
//! Control words are dropped, paragraph and tab words become whitespace,
//! `\'hh` and `\uN` escapes are decoded, and destinations that hold no
//! document text (font tables, pictures, `{\*...}` groups) are skipped.

/// Destinations whose content is never document text
const SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl", "colortbl", "stylesheet", "info", "pict", "header", "footer", "headerl", "headerr",
    "headerf", "footerl", "footerr", "footerf", "listtable", "listoverridetable", "rsidtbl",
    "generator", "themedata", "colorschememapping", "latentstyles", "datastore", "xmlnstbl",
    "object", "fldinst",
];

pub fn rtf_to_text(raw: &[u8]) -> String {
    let source = String::from_utf8_lossy(raw);
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::new();

    // Skip state of each enclosing group
    let mut groups: Vec<bool> = Vec::new();
    let mut skip = false;
    // Fallback characters still to drop after a \uN escape
    let mut unicode_skip = 1usize;
    let mut pending_fallback = 0usize;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match c {
            '{' => groups.push(skip),
            '}' => skip = groups.pop().unwrap_or(false),
            '\r' | '\n' => {}
            '\\' => {
                let Some(&next) = chars.get(i) else { break };
                if next.is_ascii_alphabetic() {
                    let (word, param, end) = control_word(&chars, i);
                    i = end;
                    if skip {
                        continue;
                    }
                    match word.as_str() {
                        "par" | "line" | "sect" | "page" | "row" => out.push('\n'),
                        "tab" | "cell" => out.push('\t'),
                        "u" => {
                            if let Some(code) = param {
                                let code = if code < 0 { code + 65536 } else { code };
                                if let Some(ch) = u32::try_from(code).ok().and_then(char::from_u32) {
                                    out.push(ch);
                                }
                                pending_fallback = unicode_skip;
                            }
                        }
                        "uc" => unicode_skip = param.and_then(|n| usize::try_from(n).ok()).unwrap_or(1),
                        word if SKIPPED_DESTINATIONS.contains(&word) => skip = true,
                        _ => {}
                    }
                    continue;
                }

                i += 1;
                match next {
                    '*' => skip = true,
                    '\'' => {
                        let hex: String = chars.iter().skip(i).take(2).collect();
                        i += hex.chars().count();
                        let Ok(byte) = u8::from_str_radix(&hex, 16) else { continue };
                        if skip {
                            continue;
                        }
                        if pending_fallback > 0 {
                            pending_fallback -= 1;
                        } else {
                            // Latin-1 maps bytes straight onto code points
                            out.push(char::from(byte));
                        }
                    }
                    '\\' | '{' | '}' if !skip => out.push(next),
                    '~' if !skip => out.push(' '),
                    '\r' | '\n' if !skip => out.push('\n'),
                    _ => {}
                }
            }
            _ => {
                if skip {
                    continue;
                }
                if pending_fallback > 0 {
                    pending_fallback -= 1;
                    continue;
                }
                out.push(c);
            }
        }
    }

    out
}

/// Reads `\word[-]N ` starting at `start`; returns the word, its numeric
/// parameter and the index after the optional delimiting space
fn control_word(chars: &[char], start: usize) -> (String, Option<i32>, usize) {
    let mut i = start;
    while i < chars.len() && chars[i].is_ascii_alphabetic() {
        i += 1;
    }
    let word: String = chars[start..i].iter().collect();

    let number_start = i;
    if i < chars.len() && (chars[i] == '-' || chars[i].is_ascii_digit()) {
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }
    let param = chars[number_start..i]
        .iter()
        .collect::<String>()
        .parse()
        .ok();

    if i < chars.len() && chars[i] == ' ' {
        i += 1;
    }
    (word, param, i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_and_formatting_are_flattened() {
        let rtf = br"{\rtf1\ansi{\fonttbl{\f0 Arial;}}\f0\pard Invoice \b 42\b0\par Total: caf\'e9\par}";
        assert_eq!(rtf_to_text(rtf), "Invoice 42\nTotal: caf\u{e9}\n");
    }

    #[test]
    fn unicode_escapes_drop_their_fallback() {
        let rtf = br"{\rtf1 Amount \u8364? 5\tab due}";
        assert_eq!(rtf_to_text(rtf), "Amount \u{20ac} 5\tdue");
    }

    #[test]
    fn ignorable_destinations_and_escaped_braces() {
        let rtf = br"{\rtf1{\*\generator Writer;}{\info{\title Secret}}Ref \{A-1\}\par}";
        assert_eq!(rtf_to_text(rtf), "Ref {A-1}\n");
    }
}
