//! A small recursive-descent parser for the newick tree format.
//!
//! Supported grammar (whitespace is ignored everywhere):
//!
//! ```text
//! tree   := clade ';'
//! clade  := [ '(' clade (',' clade)* ')' ] [name] [':' length]
//! ```

use super::{Clade, TreeError};

pub fn newick(text: &str) -> Result<Clade, TreeError> {
    let bytes: Vec<u8> = text.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    let mut cursor = Cursor { bytes: &bytes, pos: 0 };

    let root = cursor.clade()?;
    match cursor.next() {
        Some(b';') => (),
        Some(c) => return Err(TreeError::UnexpectedCharacter { at: cursor.pos - 1, found: c as char }),
        None => return Err(TreeError::UnexpectedEnd),
    }
    if cursor.peek().is_some() {
        return Err(TreeError::TrailingCharacters);
    }
    Ok(root)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    fn clade(&mut self) -> Result<Clade, TreeError> {
        let mut children = Vec::new();

        if self.peek() == Some(b'(') {
            self.next();
            loop {
                children.push(self.clade()?);
                match self.next() {
                    Some(b',') => continue,
                    Some(b')') => break,
                    Some(c) => {
                        return Err(TreeError::UnexpectedCharacter { at: self.pos - 1, found: c as char })
                    }
                    None => return Err(TreeError::UnexpectedEnd),
                }
            }
        }

        let name = self.label();
        let branch_length = match self.peek() {
            Some(b':') => {
                self.next();
                self.branch_length()?
            }
            _ => 0.0,
        };

        Ok(Clade { name, branch_length, children })
    }

    fn label(&mut self) -> Option<String> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if matches!(byte, b'(' | b')' | b',' | b':' | b';') {
                break;
            }
            self.next();
        }
        if self.pos == start {
            None
        } else {
            Some(String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned())
        }
    }

    fn branch_length(&mut self) -> Result<f64, TreeError> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if matches!(byte, b'(' | b')' | b',' | b':' | b';') {
                break;
            }
            self.next();
        }
        let raw = String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned();
        raw.parse::<f64>()
            .map_err(|_| TreeError::InvalidBranchLength { at: start, value: raw })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn parses_leaf_names_and_lengths() {
        let root = newick("(A:0.1,B:0.25,C:1e-3)root:0.0;").unwrap();
        assert_eq!(root.name.as_deref(), Some("root"));
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.children[0].name.as_deref(), Some("A"));
        assert_approx_eq!(f64, root.children[1].branch_length, 0.25);
        assert_approx_eq!(f64, root.children[2].branch_length, 1e-3);
    }

    #[test]
    fn nested_clades_and_whitespace() {
        let root = newick("( (A:0.1, B:0.2) inner:0.3 , C:0.4 );").unwrap();
        assert_eq!(root.children.len(), 2);
        let inner = &root.children[0];
        assert_eq!(inner.name.as_deref(), Some("inner"));
        assert_eq!(inner.children.len(), 2);
    }

    #[test]
    fn missing_branch_lengths_default_to_zero() {
        let root = newick("(A,B);").unwrap();
        assert_approx_eq!(f64, root.children[0].branch_length, 0.0);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(newick("(A:0.1,B:0.2"), Err(TreeError::UnexpectedEnd)));
        assert!(matches!(newick("(A,B);extra"), Err(TreeError::TrailingCharacters)));
        assert!(matches!(newick("(A:zzz);"), Err(TreeError::InvalidBranchLength { .. })));
    }
}
