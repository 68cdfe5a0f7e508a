use logos::{Lexer, Logos};
use std::fmt;
use std::ops::Range;

use crate::error::{ParseError, ParseResult};

/// Tokens of the markup form
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    /// `<name`, attributes follow
    StartTag(&'src str),
    /// `</name>`
    EndTag(&'src str),
    /// Attribute name, or an unquoted attribute value after `=`
    AttrName(&'src str),
    Equals,
    /// Quoted attribute value, quotes stripped, entities still encoded
    AttrValue(&'src str),
    /// `>` closing a start tag
    TagEnd,
    /// `/>`
    SelfClose,
    /// Character data, entities still encoded
    Text(&'src str),
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::StartTag(name) => write!(f, "<{}", name),
            Token::EndTag(name) => write!(f, "</{}>", name),
            Token::AttrName(name) => write!(f, "{}", name),
            Token::Equals => write!(f, "="),
            Token::AttrValue(value) => write!(f, "\"{}\"", value),
            Token::TagEnd => write!(f, ">"),
            Token::SelfClose => write!(f, "/>"),
            Token::Text(text) => write!(f, "text '{}'", text),
        }
    }
}

/// Lexer state between tags
#[derive(Logos, Debug, Clone, PartialEq)]
enum ContentToken<'src> {
    #[regex(r"<[a-zA-Z][a-zA-Z0-9_:\-]*", |lex| &lex.slice()[1..])]
    StartTag(&'src str),

    #[regex(r"</[a-zA-Z][a-zA-Z0-9_:\-]*[ \t\r\n]*>", end_tag_name)]
    EndTag(&'src str),

    // Doctype and comments
    #[regex(r"<![^>]*>")]
    Declaration,

    // A `<` that opens nothing is literal text
    #[token("<")]
    Lt,

    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),
}

fn end_tag_name<'src>(lex: &mut Lexer<'src, ContentToken<'src>>) -> &'src str {
    lex.slice()[2..].trim_end_matches('>').trim_end()
}

/// Lexer state inside a start tag
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum TagToken<'src> {
    #[regex(r#"[^ \t\r\n=/>"'<]+"#, |lex| lex.slice())]
    Name(&'src str),

    #[token("=")]
    Equals,

    #[regex(r#""[^"]*""#, strip_quotes)]
    #[regex(r"'[^']*'", strip_quotes)]
    Quoted(&'src str),

    #[token(">")]
    Close,

    #[token("/>")]
    SelfClose,

    #[token("/")]
    Slash,
}

fn strip_quotes<'src>(lex: &mut Lexer<'src, TagToken<'src>>) -> &'src str {
    let slice = lex.slice();
    &slice[1..slice.len() - 1]
}

/// Tokenize markup, switching lexer state at tag boundaries
pub fn tokenize(source: &str) -> ParseResult<Vec<(Token<'_>, Range<usize>)>> {
    let mut tokens = Vec::new();
    let mut content = ContentToken::lexer(source);

    while let Some(result) = content.next() {
        let span = content.span();
        let token = result.map_err(|_| ParseError::lexer_error(span.start))?;
        match token {
            ContentToken::StartTag(name) => {
                tokens.push((Token::StartTag(name), span));
                let mut tag = content.morph::<TagToken>();
                tokenize_tag(&mut tag, &mut tokens)?;
                content = tag.morph();
            }
            ContentToken::EndTag(name) => tokens.push((Token::EndTag(name), span)),
            ContentToken::Lt => tokens.push((Token::Text("<"), span)),
            ContentToken::Text(text) => tokens.push((Token::Text(text), span)),
            ContentToken::Declaration => {}
        }
    }

    Ok(tokens)
}

fn tokenize_tag<'src>(
    tag: &mut Lexer<'src, TagToken<'src>>,
    tokens: &mut Vec<(Token<'src>, Range<usize>)>,
) -> ParseResult<()> {
    while let Some(result) = tag.next() {
        let span = tag.span();
        let token = result.map_err(|_| ParseError::lexer_error(span.start))?;
        match token {
            TagToken::Name(name) => tokens.push((Token::AttrName(name), span)),
            TagToken::Equals => tokens.push((Token::Equals, span)),
            TagToken::Quoted(value) => tokens.push((Token::AttrValue(value), span)),
            TagToken::Slash => {}
            TagToken::Close => {
                tokens.push((Token::TagEnd, span));
                return Ok(());
            }
            TagToken::SelfClose => {
                tokens.push((Token::SelfClose, span));
                return Ok(());
            }
        }
    }
    Ok(())
}
