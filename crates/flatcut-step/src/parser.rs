//! Part 21 parser: builds the raw instance graph from tokens.
//!
//! Instances are stored by id without interpreting their semantics. Simple
//! instances (`#1 = LINE(...)`) hold one record; complex instances
//! (`#2 = (LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.MILLI.,.METRE.))`) hold one
//! record per partial type, in file order.

use crate::error::{Result, StepError};
use crate::lexer::{Lexer, SpannedToken, Token};
use std::collections::HashMap;

/// A single parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum StepValue {
    /// Entity reference (`#123`).
    EntityRef(u64),
    /// String literal.
    String(String),
    /// Real number.
    Real(f64),
    /// Integer number.
    Integer(i64),
    /// Enumeration (`.T.`).
    Enum(String),
    /// Binary literal.
    Binary(String),
    /// Aggregate `( ... )`.
    List(Vec<StepValue>),
    /// Derived value `*`.
    Derived,
    /// Unset value `$`.
    Null,
    /// Typed parameter such as `LENGTH_MEASURE(25.4)`.
    Typed {
        /// Type name.
        type_name: String,
        /// Parameters.
        args: Vec<StepValue>,
    },
}

impl StepValue {
    /// Entity reference, if this is one.
    pub fn as_entity_ref(&self) -> Option<u64> {
        match self {
            StepValue::EntityRef(id) => Some(*id),
            _ => None,
        }
    }

    /// Numeric value; integers and single-argument typed measures
    /// (`LENGTH_MEASURE(1.)`) are accepted.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            StepValue::Real(v) => Some(*v),
            StepValue::Integer(v) => Some(*v as f64),
            StepValue::Typed { args, .. } if args.len() == 1 => args[0].as_real(),
            _ => None,
        }
    }

    /// Integer value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            StepValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// String value.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            StepValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Enumeration value.
    pub fn as_enum(&self) -> Option<&str> {
        match self {
            StepValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean/logical enumeration (`.T.` / `.F.`).
    pub fn as_bool(&self) -> Option<bool> {
        match self.as_enum()? {
            "T" | "TRUE" => Some(true),
            "F" | "FALSE" => Some(false),
            _ => None,
        }
    }

    /// Aggregate elements.
    pub fn as_list(&self) -> Option<&[StepValue]> {
        match self {
            StepValue::List(v) => Some(v),
            _ => None,
        }
    }

    /// Whether this is `$`.
    pub fn is_null(&self) -> bool {
        matches!(self, StepValue::Null)
    }
}

/// One partial type of an instance: its name and parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Type name (upper case).
    pub name: String,
    /// Parameters.
    pub args: Vec<StepValue>,
}

/// A parsed instance.
#[derive(Debug, Clone)]
pub struct StepEntity {
    /// Instance id.
    pub id: u64,
    /// Records; exactly one for simple instances.
    pub records: Vec<Record>,
}

impl StepEntity {
    /// Name of the first record. For simple instances this is the entity type.
    pub fn type_name(&self) -> &str {
        self.records.first().map(|r| r.name.as_str()).unwrap_or("")
    }

    /// Whether the instance was written in complex (multi-record) form.
    pub fn is_complex(&self) -> bool {
        self.records.len() > 1
    }

    /// The record with the given type name.
    pub fn record(&self, name: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Whether the instance has a record of the given type.
    pub fn has_record(&self, name: &str) -> bool {
        self.record(name).is_some()
    }
}

/// The parsed contents of a file.
#[derive(Debug, Clone, Default)]
pub struct StepFile {
    /// Header section records (FILE_DESCRIPTION, FILE_NAME, FILE_SCHEMA).
    pub header: Vec<Record>,
    /// Data section instances by id.
    pub entities: HashMap<u64, StepEntity>,
}

impl StepFile {
    /// Instance by id.
    pub fn get(&self, id: u64) -> Option<&StepEntity> {
        self.entities.get(&id)
    }

    /// Instance by id, or [`StepError::MissingEntity`].
    pub fn require(&self, id: u64) -> Result<&StepEntity> {
        self.entities.get(&id).ok_or(StepError::MissingEntity(id))
    }

    /// All instances whose type (or any complex record) is `type_name`,
    /// sorted by id so iteration order is stable.
    pub fn entities_of_type(&self, type_name: &str) -> Vec<&StepEntity> {
        let mut found: Vec<&StepEntity> = self
            .entities
            .values()
            .filter(|e| e.has_record(type_name))
            .collect();
        found.sort_by_key(|e| e.id);
        found
    }

    /// Header record by name.
    pub fn header_record(&self, name: &str) -> Option<&Record> {
        self.header.iter().find(|r| r.name == name)
    }
}

/// Recursive-descent parser over a token vector.
pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    /// Parse a whole file.
    pub fn parse(input: &[u8]) -> Result<StepFile> {
        let tokens = Lexer::new(input).tokenize()?;
        let mut parser = Parser { tokens, pos: 0 };
        parser.file()
    }

    fn file(&mut self) -> Result<StepFile> {
        let mut file = StepFile::default();

        self.expect_keyword("ISO-10303-21")?;
        self.expect(&Token::Semicolon)?;

        loop {
            match self.peek_token() {
                Some(Token::Keyword(k)) if k == "HEADER" => {
                    self.pos += 1;
                    self.expect(&Token::Semicolon)?;
                    file.header = self.header_records()?;
                    self.end_section()?;
                }
                Some(Token::Keyword(k)) if k == "DATA" => {
                    self.pos += 1;
                    // edition 3 allows DATA('name', ('schema'));
                    if self.check(&Token::LParen) {
                        self.args(None)?;
                    }
                    self.expect(&Token::Semicolon)?;
                    while let Some(Token::EntityRef(_)) = self.peek_token() {
                        let entity = self.instance()?;
                        file.entities.insert(entity.id, entity);
                    }
                    self.end_section()?;
                }
                Some(Token::Keyword(k)) if k == "END-ISO-10303-21" => {
                    self.pos += 1;
                    self.expect(&Token::Semicolon)?;
                    break;
                }
                // tolerate truncated files that stop after ENDSEC
                None => break,
                Some(other) => {
                    let msg = format!("unexpected token {other:?} at top level");
                    return Err(self.error(None, msg));
                }
            }
        }

        Ok(file)
    }

    fn end_section(&mut self) -> Result<()> {
        self.expect_keyword("ENDSEC")?;
        self.expect(&Token::Semicolon)
    }

    fn header_records(&mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(Token::Keyword(name)) = self.peek_token().cloned() {
            if name == "ENDSEC" {
                break;
            }
            self.pos += 1;
            let args = self.args(None)?;
            self.expect(&Token::Semicolon)?;
            records.push(Record { name, args });
        }
        Ok(records)
    }

    fn instance(&mut self) -> Result<StepEntity> {
        let id = match self.next_token() {
            Some(Token::EntityRef(id)) => id,
            other => return Err(self.error(None, format!("expected instance name, got {other:?}"))),
        };
        self.expect(&Token::Equals)?;

        let records = if self.check(&Token::LParen) {
            // complex instance: ( NAME(args) NAME(args) ... )
            self.pos += 1;
            let mut records = Vec::new();
            while !self.check(&Token::RParen) {
                records.push(self.record(id)?);
            }
            self.pos += 1;
            if records.is_empty() {
                return Err(self.error(Some(id), "empty complex instance"));
            }
            records
        } else {
            vec![self.record(id)?]
        };

        self.expect(&Token::Semicolon)?;
        Ok(StepEntity { id, records })
    }

    fn record(&mut self, id: u64) -> Result<Record> {
        match self.next_token() {
            Some(Token::Keyword(name)) => {
                let args = self.args(Some(id))?;
                Ok(Record { name, args })
            }
            other => Err(self.error(Some(id), format!("expected type name, got {other:?}"))),
        }
    }

    fn args(&mut self, id: Option<u64>) -> Result<Vec<StepValue>> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                args.push(self.value(id)?);
                if self.check(&Token::Comma) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        self.expect(&Token::RParen)?;
        Ok(args)
    }

    fn value(&mut self, id: Option<u64>) -> Result<StepValue> {
        let value = match self.peek_token().cloned() {
            Some(Token::LParen) => return self.args(id).map(StepValue::List),
            Some(Token::Keyword(type_name)) => {
                self.pos += 1;
                let args = self.args(id)?;
                return Ok(StepValue::Typed { type_name, args });
            }
            Some(Token::EntityRef(r)) => StepValue::EntityRef(r),
            Some(Token::String(s)) => StepValue::String(s),
            Some(Token::Real(v)) => StepValue::Real(v),
            Some(Token::Integer(v)) => StepValue::Integer(v),
            Some(Token::Enum(s)) => StepValue::Enum(s),
            Some(Token::Binary(s)) => StepValue::Binary(s),
            Some(Token::Asterisk) => StepValue::Derived,
            Some(Token::Dollar) => StepValue::Null,
            other => return Err(self.error(id, format!("unexpected value {other:?}"))),
        };
        self.pos += 1;
        Ok(value)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn next_token(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).map(|t| t.token.clone());
        self.pos += 1;
        tok
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek_token() == Some(expected)
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        if self.check(expected) {
            self.pos += 1;
            Ok(())
        } else {
            let msg = format!("expected {expected:?}, got {:?}", self.peek_token());
            Err(self.error(None, msg))
        }
    }

    fn expect_keyword(&mut self, name: &str) -> Result<()> {
        match self.peek_token() {
            Some(Token::Keyword(k)) if k == name => {
                self.pos += 1;
                Ok(())
            }
            other => {
                let msg = format!("expected keyword '{name}', got {other:?}");
                Err(self.error(None, msg))
            }
        }
    }

    fn error(&self, entity_id: Option<u64>, message: impl Into<String>) -> StepError {
        let line = self
            .tokens
            .get(self.pos.min(self.tokens.len().saturating_sub(1)))
            .map(|t| t.line)
            .unwrap_or(0);
        StepError::parser(line, entity_id, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(data: &str) -> String {
        format!(
            "ISO-10303-21;\nHEADER;\nFILE_DESCRIPTION((''), '2;1');\nENDSEC;\nDATA;\n{data}\nENDSEC;\nEND-ISO-10303-21;\n"
        )
    }

    #[test]
    fn test_simple_instances() {
        let file = Parser::parse(
            wrap("#1 = CARTESIAN_POINT('origin', (0.0, 0.0, 0.0));\n#2 = DIRECTION('x', (1.0, 0.0, 0.0));")
                .as_bytes(),
        )
        .unwrap();
        assert_eq!(file.header.len(), 1);
        assert_eq!(file.entities.len(), 2);
        let p = file.get(1).unwrap();
        assert_eq!(p.type_name(), "CARTESIAN_POINT");
        assert!(!p.is_complex());
        assert_eq!(p.records[0].args[0].as_string(), Some("origin"));
    }

    #[test]
    fn test_complex_instance() {
        let file = Parser::parse(
            wrap("#7 = ( LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.MILLI.,.METRE.) );").as_bytes(),
        )
        .unwrap();
        let unit = file.get(7).unwrap();
        assert!(unit.is_complex());
        assert!(unit.has_record("LENGTH_UNIT"));
        let si = unit.record("SI_UNIT").unwrap();
        assert_eq!(si.args[0].as_enum(), Some("MILLI"));
        assert_eq!(file.entities_of_type("NAMED_UNIT").len(), 1);
    }

    #[test]
    fn test_typed_measure_and_null() {
        let file = Parser::parse(
            wrap("#3 = LENGTH_MEASURE_WITH_UNIT(LENGTH_MEASURE(25.4), #7);\n#4 = SOME_ENTITY($, *, .T.);")
                .as_bytes(),
        )
        .unwrap();
        let m = file.get(3).unwrap();
        assert_eq!(m.records[0].args[0].as_real(), Some(25.4));
        let e = file.get(4).unwrap();
        assert!(e.records[0].args[0].is_null());
        assert_eq!(e.records[0].args[1], StepValue::Derived);
        assert_eq!(e.records[0].args[2].as_bool(), Some(true));
    }

    #[test]
    fn test_entities_of_type_sorted() {
        let file = Parser::parse(
            wrap("#9 = CARTESIAN_POINT('', (0.,0.,0.));\n#2 = CARTESIAN_POINT('', (1.,0.,0.));")
                .as_bytes(),
        )
        .unwrap();
        let ids: Vec<u64> = file
            .entities_of_type("CARTESIAN_POINT")
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![2, 9]);
    }

    #[test]
    fn test_error_reports_entity() {
        let err = Parser::parse(wrap("#5 = LINE('', #1 #2);").as_bytes()).unwrap_err();
        assert!(matches!(err, StepError::Parser { .. }));
        assert!(Parser::parse(b"NOT-A-STEP-FILE;").is_err());
    }
}
