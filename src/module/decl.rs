//! IDL-style member declarations.
//!
//! Modules describe members as short declaration strings:
//!
//! ```text
//! long getCount()
//! [oneway] void notify([in] string message)
//! void read([out] sequence<byte> data, [in] long max) raises (test.IOException)
//! readonly string Title
//! createWithArguments(string url, any... args)
//! ```
//!
//! Type names without a `.` are taken relative to the module's namespace.

use logos::Logos;

use orb_core::{
    AttributeEntry, ConstructorEntry, MethodSignature, Param, ParamDirection, PrimitiveKind,
    QualifiedName, RegistrationError, TypeRef,
};

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
enum Token {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token(",")]
    Comma,
    #[token("...")]
    Ellipsis,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*")]
    Ident,
}

/// Parse a method declaration.
pub fn parse_method(decl: &str, namespace: &[String]) -> Result<MethodSignature, RegistrationError> {
    let mut p = DeclParser::new(decl, namespace)?;
    let oneway = p.modifier("oneway")?;
    let return_type = p.parse_type()?;
    let name = p.ident()?;
    let mut method = MethodSignature::new(name, return_type);
    p.expect(Token::LParen, "'('")?;
    if !p.eat(Token::RParen) {
        loop {
            method = method.with_param(p.parse_param()?);
            if p.eat(Token::RParen) {
                break;
            }
            p.expect(Token::Comma, "',' or ')'")?;
        }
    }
    for exception in p.parse_raises()? {
        method = method.raises(exception);
    }
    if oneway {
        method = method.oneway();
    }
    p.finish()?;
    Ok(method)
}

/// Parse an attribute declaration (`[readonly] [bound] type Name [raises (...)]`).
///
/// A `raises` clause applies to the getter.
pub fn parse_attribute(decl: &str, namespace: &[String]) -> Result<AttributeEntry, RegistrationError> {
    let mut p = DeclParser::new(decl, namespace)?;
    let mut readonly = false;
    let mut bound = false;
    loop {
        if p.eat_keyword("readonly") {
            readonly = true;
        } else if p.eat_keyword("bound") {
            bound = true;
        } else {
            break;
        }
    }
    let ty = p.parse_type()?;
    let name = p.ident()?;
    let mut attribute = AttributeEntry::new(name, ty);
    if readonly {
        attribute = attribute.readonly();
    }
    if bound {
        attribute = attribute.bound();
    }
    attribute.get_raises = p.parse_raises()?;
    p.finish()?;
    Ok(attribute)
}

/// Parse a service constructor declaration.
pub fn parse_constructor(
    decl: &str,
    namespace: &[String],
) -> Result<ConstructorEntry, RegistrationError> {
    let mut p = DeclParser::new(decl, namespace)?;
    let mut ctor = ConstructorEntry::new(p.ident()?);
    p.expect(Token::LParen, "'('")?;
    if !p.eat(Token::RParen) {
        loop {
            if p.at_rest() {
                p.advance();
                p.expect(Token::Ellipsis, "'...'")?;
                ctor = ctor.with_rest(p.ident()?);
                p.expect(Token::RParen, "')' after rest parameter")?;
                break;
            }
            let param = p.parse_param()?;
            if param.direction != ParamDirection::In {
                return Err(p.error("constructor parameters must be [in]"));
            }
            ctor = ctor.with_param(param);
            if p.eat(Token::RParen) {
                break;
            }
            p.expect(Token::Comma, "',' or ')'")?;
        }
    }
    for exception in p.parse_raises()? {
        ctor = ctor.raises(exception);
    }
    p.finish()?;
    Ok(ctor)
}

/// Parse a struct or exception field (`type Name`).
pub fn parse_field(decl: &str, namespace: &[String]) -> Result<(String, TypeRef), RegistrationError> {
    let mut p = DeclParser::new(decl, namespace)?;
    let ty = p.parse_type()?;
    let name = p.ident()?;
    p.finish()?;
    Ok((name, ty))
}

/// Parse a type reference.
pub fn parse_type(decl: &str, namespace: &[String]) -> Result<TypeRef, RegistrationError> {
    let mut p = DeclParser::new(decl, namespace)?;
    let ty = p.parse_type()?;
    p.finish()?;
    Ok(ty)
}

struct DeclParser<'s> {
    decl: &'s str,
    namespace: &'s [String],
    tokens: Vec<(Token, &'s str)>,
    pos: usize,
}

impl<'s> DeclParser<'s> {
    fn new(decl: &'s str, namespace: &'s [String]) -> Result<Self, RegistrationError> {
        let mut tokens = Vec::new();
        let mut lexer = Token::lexer(decl);
        while let Some(token) = lexer.next() {
            match token {
                Ok(t) => tokens.push((t, lexer.slice())),
                Err(()) => {
                    return Err(RegistrationError::InvalidDeclaration {
                        decl: decl.to_string(),
                        reason: format!("unexpected '{}'", lexer.slice()),
                    });
                }
            }
        }
        if tokens.is_empty() {
            return Err(RegistrationError::InvalidDeclaration {
                decl: decl.to_string(),
                reason: "empty declaration".to_string(),
            });
        }
        Ok(Self {
            decl,
            namespace,
            tokens,
            pos: 0,
        })
    }

    fn error(&self, reason: impl Into<String>) -> RegistrationError {
        RegistrationError::InvalidDeclaration {
            decl: self.decl.to_string(),
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<(Token, &'s str)> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<(Token, &'s str)> {
        self.tokens.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn eat(&mut self, token: Token) -> bool {
        if self.peek().is_some_and(|(t, _)| t == token) {
            self.advance();
            return true;
        }
        false
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek() == Some((Token::Ident, keyword)) {
            self.advance();
            return true;
        }
        false
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), RegistrationError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, what: &str) -> RegistrationError {
        match self.peek() {
            Some((_, text)) => self.error(format!("expected {what}, found '{text}'")),
            None => self.error(format!("expected {what}, found end of declaration")),
        }
    }

    fn ident(&mut self) -> Result<String, RegistrationError> {
        match self.peek() {
            Some((Token::Ident, text)) => {
                self.advance();
                Ok(text.to_string())
            }
            _ => Err(self.unexpected("a name")),
        }
    }

    fn finish(&self) -> Result<(), RegistrationError> {
        match self.peek() {
            None => Ok(()),
            Some((_, text)) => Err(self.error(format!("unexpected trailing '{text}'"))),
        }
    }

    /// `[keyword]` or bare `keyword`.
    fn modifier(&mut self, keyword: &str) -> Result<bool, RegistrationError> {
        if self.peek() == Some((Token::LBracket, "[")) && self.peek_at(1) == Some((Token::Ident, keyword)) {
            self.pos += 2;
            self.expect(Token::RBracket, "']'")?;
            return Ok(true);
        }
        Ok(self.eat_keyword(keyword))
    }

    fn at_rest(&self) -> bool {
        self.peek() == Some((Token::Ident, "any"))
            && self.peek_at(1).is_some_and(|(t, _)| t == Token::Ellipsis)
    }

    fn parse_direction(&mut self) -> Result<ParamDirection, RegistrationError> {
        let bracketed = self.eat(Token::LBracket);
        let direction = match self.peek() {
            Some((Token::Ident, "in")) => Some(ParamDirection::In),
            Some((Token::Ident, "out")) => Some(ParamDirection::Out),
            Some((Token::Ident, "inout")) => Some(ParamDirection::InOut),
            _ => None,
        };
        match (bracketed, direction) {
            (true, Some(d)) => {
                self.advance();
                self.expect(Token::RBracket, "']'")?;
                Ok(d)
            }
            (true, None) => Err(self.unexpected("'in', 'out' or 'inout'")),
            (false, Some(d)) if self.peek_at(1).is_some_and(|(t, _)| t == Token::Ident) => {
                self.advance();
                Ok(d)
            }
            (false, _) => Ok(ParamDirection::In),
        }
    }

    fn parse_param(&mut self) -> Result<Param, RegistrationError> {
        let direction = self.parse_direction()?;
        let ty = self.parse_type()?;
        if ty.is_void() {
            return Err(self.error("parameters cannot be void"));
        }
        let name = self.ident()?;
        Ok(Param::new(name, ty, direction))
    }

    fn parse_raises(&mut self) -> Result<Vec<QualifiedName>, RegistrationError> {
        if !self.eat_keyword("raises") {
            return Ok(Vec::new());
        }
        self.expect(Token::LParen, "'(' after raises")?;
        let mut names = Vec::new();
        loop {
            let name = self.ident()?;
            names.push(self.qualify(&name));
            if self.eat(Token::RParen) {
                return Ok(names);
            }
            self.expect(Token::Comma, "',' or ')'")?;
        }
    }

    fn parse_type(&mut self) -> Result<TypeRef, RegistrationError> {
        let word = self.ident()?;
        match word.as_str() {
            "unsigned" => {
                let width = self.ident()?;
                PrimitiveKind::from_name(&format!("unsigned {width}"))
                    .map(TypeRef::Primitive)
                    .ok_or_else(|| self.error(format!("unknown type 'unsigned {width}'")))
            }
            "sequence" => {
                self.expect(Token::Lt, "'<' after sequence")?;
                let element = self.parse_type()?;
                self.expect(Token::Gt, "'>'")?;
                Ok(TypeRef::sequence(element))
            }
            other => Ok(match PrimitiveKind::from_name(other) {
                Some(kind) => TypeRef::Primitive(kind),
                None => TypeRef::Named(self.qualify(other)),
            }),
        }
    }

    fn qualify(&self, name: &str) -> QualifiedName {
        if name.contains('.') || self.namespace.is_empty() {
            QualifiedName::from_qualified_string(name)
        } else {
            QualifiedName::new(name, self.namespace.to_vec())
        }
    }
}
