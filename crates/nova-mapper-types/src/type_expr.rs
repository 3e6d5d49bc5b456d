//! Parser for type expressions such as `Dictionary<string, long?>`, `int[]` or
//! `(int A, string B)`.

use thiserror::Error;

use crate::{KnownType, TupleElementDef, TypeEnv, TypeRef, TypeStore};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeExprError {
    #[error("unknown type `{0}`")]
    UnknownType(String),
    #[error("malformed type expression `{expr}` at offset {offset}: {message}")]
    Malformed {
        expr: String,
        offset: usize,
        message: &'static str,
    },
    #[error("`{name}` expects {expected} type argument(s), found {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },
}

impl TypeStore {
    /// Parse a type expression, instantiating library types as needed.
    ///
    /// Namespaces are accepted and ignored for library types (`System.Collections.Generic.List<int>`).
    pub fn parse(&mut self, expr: &str) -> Result<TypeRef, TypeExprError> {
        let mut parser = Parser {
            store: self,
            src: expr,
            pos: 0,
        };
        let ty = parser.ty()?;
        parser.skip_ws();
        if parser.pos != expr.len() {
            return Err(parser.malformed("unexpected trailing input"));
        }
        Ok(ty)
    }
}

struct Parser<'a> {
    store: &'a mut TypeStore,
    src: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn ty(&mut self) -> Result<TypeRef, TypeExprError> {
        self.skip_ws();
        let mut ty = if self.eat('(') {
            self.tuple()?
        } else {
            self.named()?
        };

        loop {
            self.skip_ws();
            if self.eat('?') {
                ty = ty.with_nullable(true);
            } else if self.eat('[') {
                self.skip_ws();
                if !self.eat(']') {
                    return Err(self.malformed("expected `]`"));
                }
                ty = TypeRef::new(self.store.array_of(ty));
            } else {
                return Ok(ty);
            }
        }
    }

    fn tuple(&mut self) -> Result<TypeRef, TypeExprError> {
        let mut elements = Vec::new();
        loop {
            let ty = self.ty()?;
            self.skip_ws();
            let name = self.ident();
            elements.push(TupleElementDef { name, ty });
            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            if self.eat(')') {
                break;
            }
            return Err(self.malformed("expected `,` or `)` in tuple"));
        }
        if elements.len() < 2 {
            return Err(self.malformed("tuples need at least two elements"));
        }
        Ok(TypeRef::new(self.store.tuple_of(elements)))
    }

    fn named(&mut self) -> Result<TypeRef, TypeExprError> {
        let start = self.pos;
        let Some(_) = self.ident() else {
            return Err(self.malformed("expected a type name"));
        };
        while self.peek() == Some('.') {
            self.pos += 1;
            if self.ident().is_none() {
                return Err(self.malformed("expected a name after `.`"));
            }
        }
        let qualified = self.src[start..self.pos].to_string();

        self.skip_ws();
        if !self.eat('<') {
            return self
                .store
                .lookup_type(&qualified)
                .map(TypeRef::new)
                .ok_or(TypeExprError::UnknownType(qualified));
        }

        let mut args = Vec::new();
        loop {
            args.push(self.ty()?);
            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            if self.eat('>') {
                break;
            }
            return Err(self.malformed("expected `,` or `>` in type arguments"));
        }

        let simple = qualified.rsplit('.').next().unwrap_or(&qualified);
        let known = KnownType::from_name(simple)
            .ok_or_else(|| TypeExprError::UnknownType(qualified.clone()))?;
        if known.arity() != args.len() {
            return Err(TypeExprError::Arity {
                name: qualified,
                expected: known.arity(),
                found: args.len(),
            });
        }
        Ok(TypeRef::new(self.store.instantiate(known, args)))
    }

    fn ident(&mut self) -> Option<String> {
        let rest = &self.src[self.pos..];
        let len = rest
            .char_indices()
            .find(|(idx, c)| {
                !(c.is_alphanumeric() || *c == '_') || (*idx == 0 && c.is_numeric())
            })
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        if len == 0 {
            return None;
        }
        self.pos += len;
        Some(rest[..len].to_string())
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn malformed(&self, message: &'static str) -> TypeExprError {
        TypeExprError::Malformed {
            expr: self.src.to_string(),
            offset: self.pos,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::display;
    use crate::TypeDef;

    fn roundtrip(store: &mut TypeStore, expr: &str) -> String {
        let ty = store.parse(expr).expect("expression should parse");
        display(&*store, ty)
    }

    #[test]
    fn parses_generic_nullable_and_array_types() {
        let mut store = TypeStore::default();
        assert_eq!(roundtrip(&mut store, "int"), "int");
        assert_eq!(roundtrip(&mut store, "string?"), "string?");
        assert_eq!(
            roundtrip(&mut store, "Dictionary<string, long?>"),
            "Dictionary<string, long?>"
        );
        assert_eq!(roundtrip(&mut store, "int?[]"), "int?[]");
        assert_eq!(
            roundtrip(&mut store, "System.Collections.Generic.List< List<Int32> >"),
            "List<List<int>>"
        );
        assert_eq!(roundtrip(&mut store, "(int A, string)"), "(int A, string)");
    }

    #[test]
    fn resolves_declared_types() {
        let mut store = TypeStore::default();
        store.upsert_type(TypeDef::class("Car"));
        assert_eq!(roundtrip(&mut store, "IEnumerable<Car?>"), "IEnumerable<Car?>");
    }

    #[test]
    fn reports_errors() {
        let mut store = TypeStore::default();
        assert_eq!(
            store.parse("Car"),
            Err(TypeExprError::UnknownType("Car".into()))
        );
        assert_eq!(
            store.parse("Dictionary<int>"),
            Err(TypeExprError::Arity {
                name: "Dictionary".into(),
                expected: 2,
                found: 1
            })
        );
        assert!(matches!(
            store.parse("List<int"),
            Err(TypeExprError::Malformed { .. })
        ));
        assert!(matches!(
            store.parse("(int)"),
            Err(TypeExprError::Malformed { .. })
        ));
    }
}
