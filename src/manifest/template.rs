//! `{placeholder}` substitution for manifest strings.
//!
//! `{{` and `}}` produce literal braces. Any other placeholder that is not
//! in the variable list is an error.

use anyhow::{Result, bail};

pub fn expand(template: &str, vars: &[(&str, &str)]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(k) => key.push(k),
                        None => bail!("Unclosed '{{' in '{}'", template),
                    }
                }
                match vars.iter().find(|(name, _)| *name == key) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        let known: Vec<String> =
                            vars.iter().map(|(name, _)| format!("{{{}}}", name)).collect();
                        bail!(
                            "Unknown placeholder {{{}}} in '{}' (expected one of {})",
                            key,
                            template,
                            known.join(", ")
                        );
                    }
                }
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => bail!("Unmatched '}}' in '{}'", template),
            _ => out.push(c),
        }
    }

    Ok(out)
}
