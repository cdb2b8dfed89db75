//! Lexer.
//!
//! Grounded on `original_source/c5c/lexer.py`: a flat token sequence
//! terminated by `EOF`, line/column tracked as the scan proceeds, comments
//! and whitespace skipped, `<`/`>` emitted as plain relational tokens (the
//! parser resolves the angle-bracket-vs-comparison ambiguity, per spec.md
//! §4.1's key policy). Unlike the Python snapshot, every keyword in
//! spec.md §3's list gets its own `TokenKind` instead of being matched later
//! by comparing an identifier's text.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Include,
    Void,
    Return,
    If,
    Else,
    While,
    For,
    Foreach,
    Do,
    Switch,
    Case,
    Default,
    Break,
    Struct,
    Enum,
    TypeKw,
    Let,
    Macro,
    Signed,
    Unsigned,
    Const,
    Fnct,
    In,
    // Punctuation
    Dot,
    Colon,
    ColonColon,
    Arrow,
    Ellipsis,
    Eq,
    Neq,
    Leq,
    Geq,
    Lt,
    Gt,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semi,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    // Literals / identifiers
    Float,
    Number,
    Char,
    Str,
    Id,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?})", self.kind, self.text)
    }
}

#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

fn keyword_kind(word: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match word {
        "include" => Include,
        "void" => Void,
        "return" => Return,
        "if" => If,
        "else" => Else,
        "while" => While,
        "for" => For,
        "foreach" => Foreach,
        "do" => Do,
        "switch" => Switch,
        "case" => Case,
        "default" => Default,
        "break" => Break,
        "struct" => Struct,
        "enum" => Enum,
        "type" => TypeKw,
        "let" => Let,
        "macro" => Macro,
        "signed" => Signed,
        "unsigned" => Unsigned,
        "const" => Const,
        "fnct" => Fnct,
        "in" => In,
        _ => return None,
    })
}

fn decode_escapes(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(other) => return Err(format!("unknown escape sequence '\\{}'", other)),
            None => return Err("unterminated escape sequence".to_string()),
        }
    }
    Ok(out)
}

/// Tokenize C5 source text. Returns a flat sequence ending in `Eof`, or a
/// `LexError` on the first unrecognized character (spec.md §4.1: "a
/// character that matches no rule is a hard error").
pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    let bytes: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;
    let mut line = 1usize;
    let mut line_start = 0usize;

    macro_rules! push {
        ($kind:expr, $text:expr, $start:expr, $col:expr) => {
            tokens.push(Token { kind: $kind, text: $text, line, column: $col })
        };
    }

    while i < bytes.len() {
        let c = bytes[i];
        let col = i - line_start;

        if c == '\n' {
            i += 1;
            line += 1;
            line_start = i;
            continue;
        }
        if c == ' ' || c == '\t' || c == '\r' {
            i += 1;
            continue;
        }
        if c == '/' && bytes.get(i + 1) == Some(&'/') {
            while i < bytes.len() && bytes[i] != '\n' {
                i += 1;
            }
            continue;
        }

        // Multi-char punctuation, longest match first.
        let two: Option<(char, char)> = bytes.get(i + 1).map(|&n| (c, n));
        let three: Option<(char, char, char)> =
            bytes.get(i + 2).map(|&n2| (c, bytes[i + 1], n2)).filter(|_| bytes.get(i + 1).is_some());

        if three == Some(('.', '.', '.')) {
            push!(TokenKind::Ellipsis, "...".to_string(), i, col);
            i += 3;
            continue;
        }
        let two_kind = two.and_then(|pair| match pair {
            (':', ':') => Some((TokenKind::ColonColon, "::")),
            ('-', '>') => Some((TokenKind::Arrow, "->")),
            ('=', '=') => Some((TokenKind::Eq, "==")),
            ('!', '=') => Some((TokenKind::Neq, "!=")),
            ('<', '=') => Some((TokenKind::Leq, "<=")),
            ('>', '=') => Some((TokenKind::Geq, ">=")),
            _ => None,
        });
        if let Some((kind, text)) = two_kind {
            push!(kind, text.to_string(), i, col);
            i += 2;
            continue;
        }

        let single_kind = match c {
            '.' => Some(TokenKind::Dot),
            ':' => Some(TokenKind::Colon),
            '<' => Some(TokenKind::Lt),
            '>' => Some(TokenKind::Gt),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '{' => Some(TokenKind::LBrace),
            '}' => Some(TokenKind::RBrace),
            '[' => Some(TokenKind::LBracket),
            ']' => Some(TokenKind::RBracket),
            ',' => Some(TokenKind::Comma),
            ';' => Some(TokenKind::Semi),
            '=' => Some(TokenKind::Assign),
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '*' => Some(TokenKind::Star),
            '/' => Some(TokenKind::Slash),
            '%' => Some(TokenKind::Percent),
            '&' => Some(TokenKind::Amp),
            _ => None,
        };
        if let Some(kind) = single_kind {
            push!(kind, c.to_string(), i, col);
            i += 1;
            continue;
        }

        if c.is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i < bytes.len() && bytes[i] == '.' && bytes.get(i + 1).is_some_and(|d| d.is_ascii_digit()) {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                let text: String = bytes[start..i].iter().collect();
                push!(TokenKind::Float, text, start, col);
            } else {
                let text: String = bytes[start..i].iter().collect();
                push!(TokenKind::Number, text, start, col);
            }
            continue;
        }

        if c == '\'' {
            let start_line = line;
            let start_col = col;
            i += 1;
            let mut raw = String::new();
            while i < bytes.len() && bytes[i] != '\'' {
                if bytes[i] == '\\' && i + 1 < bytes.len() {
                    raw.push(bytes[i]);
                    raw.push(bytes[i + 1]);
                    i += 2;
                } else {
                    raw.push(bytes[i]);
                    i += 1;
                }
            }
            if i >= bytes.len() {
                return Err(LexError { message: "unterminated char literal".to_string(), line: start_line, column: start_col });
            }
            i += 1; // closing '
            let decoded = decode_escapes(&raw).map_err(|message| LexError { message, line: start_line, column: start_col })?;
            tokens.push(Token { kind: TokenKind::Char, text: decoded, line: start_line, column: start_col });
            continue;
        }

        if c == '"' {
            let start_line = line;
            let start_col = col;
            i += 1;
            let mut raw = String::new();
            while i < bytes.len() && bytes[i] != '"' {
                if bytes[i] == '\n' {
                    return Err(LexError { message: "unterminated string literal".to_string(), line: start_line, column: start_col });
                }
                if bytes[i] == '\\' && i + 1 < bytes.len() {
                    raw.push(bytes[i]);
                    raw.push(bytes[i + 1]);
                    i += 2;
                } else {
                    raw.push(bytes[i]);
                    i += 1;
                }
            }
            if i >= bytes.len() {
                return Err(LexError { message: "unterminated string literal".to_string(), line: start_line, column: start_col });
            }
            i += 1; // closing "
            let decoded = decode_escapes(&raw).map_err(|message| LexError { message, line: start_line, column: start_col })?;
            tokens.push(Token { kind: TokenKind::Str, text: decoded, line: start_line, column: start_col });
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_alphanumeric() || bytes[i] == '_') {
                i += 1;
            }
            let text: String = bytes[start..i].iter().collect();
            let kind = keyword_kind(&text).unwrap_or(TokenKind::Id);
            push!(kind, text, start, col);
            continue;
        }

        return Err(LexError { message: format!("unexpected character '{}'", c), line, column: col });
    }

    tokens.push(Token { kind: TokenKind::Eof, text: String::new(), line, column: i - line_start });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_get_dedicated_kinds() {
        assert_eq!(
            kinds("foreach switch case default break type fnct in const macro"),
            vec![
                TokenKind::Foreach,
                TokenKind::Switch,
                TokenKind::Case,
                TokenKind::Default,
                TokenKind::Break,
                TokenKind::TypeKw,
                TokenKind::Fnct,
                TokenKind::In,
                TokenKind::Const,
                TokenKind::Macro,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn angle_brackets_tokenize_as_relational_tokens() {
        // Lexer does not disambiguate int<32> from a < b; that's the parser's job.
        assert_eq!(kinds("int<32>"), vec![TokenKind::Id, TokenKind::Lt, TokenKind::Number, TokenKind::Gt, TokenKind::Eof]);
    }

    #[test]
    fn string_escape_decoding() {
        let toks = lex(r#""hi\n""#).unwrap();
        assert_eq!(toks[0].text, "hi\n");
    }

    #[test]
    fn line_and_column_tracking_is_a_round_trip() {
        let src = "int\n  x = 1;";
        let toks = lex(src).unwrap();
        let x = toks.iter().find(|t| t.text == "x").unwrap();
        assert_eq!(x.line, 2);
        assert_eq!(x.column, 2);
        let line_text = src.lines().nth(x.line - 1).unwrap();
        assert_eq!(&line_text[x.column..x.column + x.text.len()], "x");
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(lex("\"abc").is_err());
    }

    #[test]
    fn mismatch_character_is_an_error() {
        assert!(lex("@").is_err());
    }
}
