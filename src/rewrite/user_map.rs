use crate::config::UserRename;
use crate::error::{ExportError, Result};
use regex::{Captures, NoExpand, Regex};

struct CompiledRename {
    mention: Regex,
    mention_replacement: String,
    field: Regex,
    to: String,
}

/// Ordered user renames applied to the raw export text before it is parsed.
/// Two forms are rewritten per entry: `[~user]` mentions and bare usernames
/// standing alone in a delimited field.
pub struct UserMapping {
    renames: Vec<CompiledRename>,
}

impl UserMapping {
    pub fn new(renames: &[UserRename]) -> Result<Self> {
        let compiled = renames
            .iter()
            .map(|rename| {
                let escaped = regex::escape(&rename.from);

                let mention =
                    Regex::new(&format!(r"\[~{}\]", escaped)).map_err(|e| ExportError::Config {
                        message: format!("Invalid user mapping '{}': {}", rename.from, e),
                    })?;

                let field = Regex::new(&format!(r"(?m)(^|,|;)({})(;|,|$)", escaped)).map_err(
                    |e| ExportError::Config {
                        message: format!("Invalid user mapping '{}': {}", rename.from, e),
                    },
                )?;

                Ok(CompiledRename {
                    mention,
                    mention_replacement: format!("[~{}]", rename.to),
                    field,
                    to: rename.to.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { renames: compiled })
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.renames.len()
    }

    /// Applies every rename, in table order, to the whole document.
    pub fn apply(&self, text: &str) -> String {
        let mut text = text.to_string();

        for rename in &self.renames {
            text = rename
                .mention
                .replace_all(&text, NoExpand(&rename.mention_replacement))
                .into_owned();

            // Two occurrences can share a delimiter, and a single pass
            // consumes that delimiter with the first match. Repeat until the
            // pattern no longer matches.
            while rename.field.is_match(&text) {
                let replaced = rename
                    .field
                    .replace_all(&text, |caps: &Captures| {
                        format!("{}{}{}", &caps[1], rename.to, &caps[3])
                    })
                    .into_owned();

                if replaced == text {
                    break;
                }
                text = replaced;
            }
        }

        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(pairs: &[(&str, &str)]) -> UserMapping {
        let renames: Vec<UserRename> = pairs
            .iter()
            .map(|(from, to)| UserRename {
                from: from.to_string(),
                to: to.to_string(),
            })
            .collect();
        UserMapping::new(&renames).unwrap()
    }

    #[test]
    fn test_mention_rewrite() {
        let mapping = mapping(&[("alice", "bob")]);
        assert_eq!(mapping.apply("[~alice]"), "[~bob]");
        assert_eq!(
            mapping.apply("please ask [~alice] and [~alice] again"),
            "please ask [~bob] and [~bob] again"
        );
    }

    #[test]
    fn test_bare_field_rewrite_preserves_delimiters() {
        let mapping = mapping(&[("alice", "bob")]);
        assert_eq!(mapping.apply(",alice,"), ",bob,");
        assert_eq!(mapping.apply(";alice;"), ";bob;");
    }

    #[test]
    fn test_adjacent_occurrences_are_both_replaced() {
        let mapping = mapping(&[("alice", "bob")]);
        assert_eq!(mapping.apply("alice,alice"), "bob,bob");
        assert_eq!(mapping.apply("alice;alice;alice"), "bob;bob;bob");
    }

    #[test]
    fn test_line_boundaries_count_as_field_edges() {
        let mapping = mapping(&[("alice", "bob")]);
        assert_eq!(mapping.apply("alice,x\nalice,y"), "bob,x\nbob,y");
        assert_eq!(mapping.apply("x,alice\ny,alice"), "x,bob\ny,bob");
    }

    #[test]
    fn test_substrings_are_not_replaced() {
        let mapping = mapping(&[("alice", "bob")]);
        assert_eq!(mapping.apply("malice,alicey"), "malice,alicey");
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let mapping = mapping(&[("alice", "bob")]);
        let once = mapping.apply("[~alice],alice;other");
        let twice = mapping.apply(&once);
        assert_eq!(once, "[~bob],bob;other");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_renames_apply_in_table_order() {
        let forward = mapping(&[("alice", "bob"), ("bob", "carol")]);
        assert_eq!(forward.apply(",alice,"), ",carol,");

        let reverse = mapping(&[("bob", "carol"), ("alice", "bob")]);
        assert_eq!(reverse.apply(",alice,"), ",bob,");
    }

    #[test]
    fn test_identity_rename_terminates() {
        let mapping = mapping(&[("alice", "alice")]);
        assert_eq!(mapping.apply(",alice,"), ",alice,");
    }

    #[test]
    fn test_regex_metacharacters_in_usernames() {
        let mapping = mapping(&[("a.user+x", "b.user")]);
        assert_eq!(mapping.apply(",a.user+x,"), ",b.user,");
        assert_eq!(mapping.apply(",aXuser+x,"), ",aXuser+x,");
    }
}
