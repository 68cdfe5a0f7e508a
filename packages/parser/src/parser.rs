use crate::ast::Node;
use crate::dom::{decode_entities, DomNode, Element};
use crate::dom_parser::DomParser;
use crate::error::{ParseError, ParseResult};
use crate::schema::Schema;
use crate::tokenizer::{tokenize, Token};

/// Markup parser producing a generic element tree
///
/// Lenient the way browsers are: stray end tags are dropped, unclosed
/// elements are closed at the end of input, and an end tag closes every
/// element opened after its match.
pub struct Parser<'src> {
    tokens: Vec<(Token<'src>, std::ops::Range<usize>)>,
    pos: usize,
    source_len: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        let tokens = tokenize(source)?;
        Ok(Self {
            tokens,
            pos: 0,
            source_len: source.len(),
        })
    }

    /// Parse a complete fragment into top-level DOM nodes
    pub fn parse_fragment(&mut self) -> ParseResult<Vec<DomNode>> {
        let mut root: Vec<DomNode> = Vec::new();
        let mut stack: Vec<Element> = Vec::new();

        while let Some((token, _)) = self.peek().cloned() {
            match token {
                Token::Text(text) => {
                    self.advance();
                    append_text(current_children(&mut stack, &mut root), decode_entities(text));
                }
                Token::StartTag(name) => {
                    self.advance();
                    let (element, self_closing) = self.parse_start_tag(name)?;
                    if self_closing || element.is_void() {
                        current_children(&mut stack, &mut root).push(DomNode::Element(element));
                    } else {
                        stack.push(element);
                    }
                }
                Token::EndTag(name) => {
                    self.advance();
                    let tag = name.to_ascii_lowercase();
                    if let Some(index) = stack.iter().rposition(|el| el.tag == tag) {
                        while stack.len() > index {
                            close_top(&mut stack, &mut root);
                        }
                    }
                }
                _ => {
                    return Err(ParseError::unexpected_token(
                        self.peek_span().start,
                        "text or tag",
                        Self::format_token(self.peek()),
                    ));
                }
            }
        }

        while !stack.is_empty() {
            close_top(&mut stack, &mut root);
        }

        Ok(root)
    }

    fn parse_start_tag(&mut self, name: &str) -> ParseResult<(Element, bool)> {
        let mut element = Element::new(name.to_ascii_lowercase());

        loop {
            match self.peek().cloned() {
                Some((Token::AttrName(attr), _)) => {
                    self.advance();
                    let value = if self.match_token(Token::Equals) {
                        self.expect_attr_value()?
                    } else {
                        String::new()
                    };
                    let attr = attr.to_ascii_lowercase();
                    if element.attr(&attr).is_none() {
                        element.attrs.push((attr, value));
                    }
                }
                Some((Token::TagEnd, _)) => {
                    self.advance();
                    return Ok((element, false));
                }
                Some((Token::SelfClose, _)) => {
                    self.advance();
                    return Ok((element, true));
                }
                None => return Err(ParseError::unexpected_eof(self.source_len)),
                Some(_) => {
                    return Err(ParseError::unexpected_token(
                        self.peek_span().start,
                        "attribute or '>'",
                        Self::format_token(self.peek()),
                    ));
                }
            }
        }
    }

    fn expect_attr_value(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some((Token::AttrValue(value), _)) | Some((Token::AttrName(value), _)) => {
                let value = decode_entities(value);
                self.advance();
                Ok(value)
            }
            None => Err(ParseError::unexpected_eof(self.source_len)),
            _ => Err(ParseError::unexpected_token(
                self.peek_span().start,
                "attribute value",
                Self::format_token(self.peek()),
            )),
        }
    }

    // Helper methods

    fn peek(&self) -> Option<&(Token<'src>, std::ops::Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&(Token<'src>, std::ops::Range<usize>)> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn check(&self, token: &Token) -> bool {
        if let Some((t, _)) = self.peek() {
            std::mem::discriminant(t) == std::mem::discriminant(token)
        } else {
            false
        }
    }

    fn match_token(&mut self, token: Token) -> bool {
        if self.check(&token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn peek_span(&self) -> std::ops::Range<usize> {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.clone())
            .unwrap_or(self.source_len..self.source_len)
    }

    fn format_token(token: Option<&(Token, std::ops::Range<usize>)>) -> String {
        match token {
            None => "end of input".to_string(),
            Some((token, _)) => token.to_string(),
        }
    }
}

fn current_children<'a>(stack: &'a mut [Element], root: &'a mut Vec<DomNode>) -> &'a mut Vec<DomNode> {
    match stack.last_mut() {
        Some(top) => &mut top.children,
        None => root,
    }
}

fn close_top(stack: &mut Vec<Element>, root: &mut Vec<DomNode>) {
    if let Some(element) = stack.pop() {
        current_children(stack, root).push(DomNode::Element(element));
    }
}

fn append_text(children: &mut Vec<DomNode>, text: String) {
    if let Some(DomNode::Text(last)) = children.last_mut() {
        last.push_str(&text);
    } else {
        children.push(DomNode::Text(text));
    }
}

/// Parse markup into an element tree
pub fn parse_dom(source: &str) -> ParseResult<Vec<DomNode>> {
    let mut parser = Parser::new(source)?;
    parser.parse_fragment()
}

/// Parse markup into a document using the built-in node types
pub fn parse(source: &str) -> ParseResult<Node> {
    parse_with_schema(source, Schema::builtin())
}

pub fn parse_with_schema(source: &str, schema: &Schema) -> ParseResult<Node> {
    let dom = parse_dom(source)?;
    Ok(DomParser::new(schema).parse_document(&dom))
}
