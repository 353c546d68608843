use crate::input_stream::Location;
use crate::node::Attributes;
use crate::tokenizer::CHAR_NUL;

// The different token types that can be emitted by the tokenizer
#[derive(Debug, PartialEq)]
pub enum TokenType {
    DocTypeToken,
    StartTagToken,
    EndTagToken,
    CommentToken,
    TextToken,
    EofToken,
}

// The different token structures that can be emitted by the tokenizer. Each
// token remembers where in the source it began.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    DocType {
        name: Option<String>,
        force_quirks: bool,
        pub_identifier: Option<String>,
        sys_identifier: Option<String>,
        location: Location,
    },
    StartTag {
        name: String,
        is_self_closing: bool,
        attributes: Attributes,
        location: Location,
    },
    EndTag {
        name: String,
        location: Location,
    },
    Comment {
        value: String,
        location: Location,
    },
    Text {
        value: String,
        location: Location,
    },
    Eof {
        location: Location,
    },
}

impl Token {
    // Returns true when any of the characters in the token are null
    pub fn is_null(&self) -> bool {
        if let Token::Text { value, .. } = self {
            value.chars().any(|ch| ch == CHAR_NUL)
        } else {
            false
        }
    }

    // Returns true when the token is an EOF token
    pub fn is_eof(&self) -> bool {
        matches!(self, Token::Eof { .. })
    }

    // Returns true if the text token is empty or only contains whitespace
    pub fn is_empty_or_white(&self) -> bool {
        if let Token::Text { value, .. } = self {
            value
                .chars()
                .all(|ch| matches!(ch, ' ' | '\t' | '\n' | '\u{000C}' | '\r'))
        } else {
            false
        }
    }

    // Returns true for a start tag with the given name
    pub fn is_start_tag(&self, tag_name: &str) -> bool {
        matches!(self, Token::StartTag { name, .. } if name == tag_name)
    }

    // Where the token began in the source
    pub fn get_location(&self) -> Location {
        match self {
            Token::DocType { location, .. }
            | Token::StartTag { location, .. }
            | Token::EndTag { location, .. }
            | Token::Comment { location, .. }
            | Token::Text { location, .. }
            | Token::Eof { location } => *location,
        }
    }

    pub fn set_location(&mut self, loc: Location) {
        match self {
            Token::DocType { location, .. }
            | Token::StartTag { location, .. }
            | Token::EndTag { location, .. }
            | Token::Comment { location, .. }
            | Token::Text { location, .. }
            | Token::Eof { location } => *location = loc,
        }
    }
}

// Each token can be displayed as a string
impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Token::DocType {
                name,
                force_quirks,
                pub_identifier,
                sys_identifier,
                ..
            } => {
                let mut result = format!("<!DOCTYPE {}", name.clone().unwrap_or_default());
                if *force_quirks {
                    result.push_str(" FORCE_QUIRKS!");
                }
                if let Some(pub_id) = pub_identifier {
                    result.push_str(&format!(" {pub_id}"));
                }
                if let Some(sys_id) = sys_identifier {
                    result.push_str(&format!(" {sys_id}"));
                }
                result.push_str(" />");
                write!(f, "{result}")
            }
            Token::Comment { value, .. } => write!(f, "Comment[<!-- {value} -->]"),
            Token::Text { value, .. } => write!(f, "Text[{value}]"),
            Token::StartTag {
                name,
                is_self_closing,
                attributes,
                ..
            } => {
                let mut result = format!("<{name}");
                for attr in attributes {
                    result.push_str(&format!(" {}=\"{}\"", attr.name, attr.value));
                }
                if *is_self_closing {
                    result.push_str(" /");
                }
                result.push('>');
                write!(f, "StartTag[{result}]")
            }
            Token::EndTag { name, .. } => write!(f, "EndTag[</{name}>]"),
            Token::Eof { .. } => write!(f, "EOF"),
        }
    }
}

pub trait TokenTrait {
    // Return the token type of the given token
    fn type_of(&self) -> TokenType;
}

impl TokenTrait for Token {
    fn type_of(&self) -> TokenType {
        match self {
            Token::DocType { .. } => TokenType::DocTypeToken,
            Token::StartTag { .. } => TokenType::StartTagToken,
            Token::EndTag { .. } => TokenType::EndTagToken,
            Token::Comment { .. } => TokenType::CommentToken,
            Token::Text { .. } => TokenType::TextToken,
            Token::Eof { .. } => TokenType::EofToken,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_type() {
        let token = Token::DocType {
            name: None,
            force_quirks: false,
            pub_identifier: None,
            sys_identifier: None,
            location: Location::default(),
        };
        assert_eq!(token.type_of(), TokenType::DocTypeToken);
    }

    #[test]
    fn test_token_is_null() {
        let token = Token::Text {
            value: "Hello\0World".to_string(),
            location: Location::default(),
        };
        assert!(token.is_null());
    }

    #[test]
    fn test_token_is_eof() {
        let token = Token::Eof {
            location: Location::default(),
        };
        assert!(token.is_eof());
    }

    #[test]
    fn test_token_is_empty_or_white() {
        let token = Token::Text {
            value: " \t\n ".to_string(),
            location: Location::default(),
        };
        assert!(token.is_empty_or_white());

        let token = Token::Text {
            value: " x ".to_string(),
            location: Location::default(),
        };
        assert!(!token.is_empty_or_white());
    }

    #[test]
    fn test_token_display() {
        let token = Token::DocType {
            name: Some("html".to_string()),
            force_quirks: false,
            pub_identifier: None,
            sys_identifier: None,
            location: Location::default(),
        };
        assert_eq!(format!("{token}"), "<!DOCTYPE html />");
    }

    #[test]
    fn test_token_display_start_tag() {
        let token = Token::StartTag {
            name: "html".to_string(),
            is_self_closing: false,
            attributes: Attributes::new(),
            location: Location::default(),
        };
        assert_eq!(format!("{token}"), "StartTag[<html>]");

        let token = Token::StartTag {
            name: "html".to_string(),
            is_self_closing: false,
            attributes: Attributes::from([("foo", "bar")]),
            location: Location::default(),
        };
        assert_eq!(format!("{token}"), "StartTag[<html foo=\"bar\">]");

        let token = Token::StartTag {
            name: "br".to_string(),
            is_self_closing: true,
            attributes: Attributes::new(),
            location: Location::default(),
        };
        assert_eq!(format!("{token}"), "StartTag[<br />]");
    }

    #[test]
    fn test_token_display_end_tag() {
        let token = Token::EndTag {
            name: "html".to_string(),
            location: Location::default(),
        };
        assert_eq!(format!("{token}"), "EndTag[</html>]");
    }

    #[test]
    fn test_token_location() {
        let mut token = Token::Comment {
            value: "".to_string(),
            location: Location::new(3, 7, 42),
        };
        assert_eq!(token.get_location(), Location::new(3, 7, 42));

        token.set_location(Location::new(1, 1, 0));
        assert_eq!(token.get_location(), Location::default());
    }
}
