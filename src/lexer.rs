//! Tokenizer for the ShaleDB SQL dialect.
//!
//! The lexer walks the source with a byte cursor and tries a fixed sequence
//! of sub-lexers at every position: keyword, symbol, string, numeric,
//! identifier. The first sub-lexer that succeeds advances the cursor and
//! emits at most one token. Keywords and symbols share a longest-match
//! helper so that `int` vs `into` and `<` vs `<=` resolve correctly.

/// 0-based position of a token in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub line: u32,
    pub col: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Select,
    From,
    As,
    Table,
    Create,
    Drop,
    Insert,
    Into,
    Values,
    Int,
    Text,
    Boolean,
    Where,
    And,
    Or,
    True,
    False,
    Unique,
    Index,
    On,
    PrimaryKey,
    Null,
    Limit,
    Offset,
}

impl Keyword {
    pub const ALL: [Keyword; 24] = [
        Keyword::Select,
        Keyword::From,
        Keyword::As,
        Keyword::Table,
        Keyword::Create,
        Keyword::Drop,
        Keyword::Insert,
        Keyword::Into,
        Keyword::Values,
        Keyword::Int,
        Keyword::Text,
        Keyword::Boolean,
        Keyword::Where,
        Keyword::And,
        Keyword::Or,
        Keyword::True,
        Keyword::False,
        Keyword::Unique,
        Keyword::Index,
        Keyword::On,
        Keyword::PrimaryKey,
        Keyword::Null,
        Keyword::Limit,
        Keyword::Offset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Select => "select",
            Keyword::From => "from",
            Keyword::As => "as",
            Keyword::Table => "table",
            Keyword::Create => "create",
            Keyword::Drop => "drop",
            Keyword::Insert => "insert",
            Keyword::Into => "into",
            Keyword::Values => "values",
            Keyword::Int => "int",
            Keyword::Text => "text",
            Keyword::Boolean => "boolean",
            Keyword::Where => "where",
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Unique => "unique",
            Keyword::Index => "index",
            Keyword::On => "on",
            Keyword::PrimaryKey => "primary key",
            Keyword::Null => "null",
            Keyword::Limit => "limit",
            Keyword::Offset => "offset",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Semicolon,
    Asterisk,
    Comma,
    LeftParen,
    RightParen,
    Eq,
    Neq,
    Concat,
    Plus,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Symbol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Symbol::Semicolon => ";",
            Symbol::Asterisk => "*",
            Symbol::Comma => ",",
            Symbol::LeftParen => "(",
            Symbol::RightParen => ")",
            Symbol::Eq => "=",
            Symbol::Neq => "<>",
            Symbol::Concat => "||",
            Symbol::Plus => "+",
            Symbol::Lt => "<",
            Symbol::Lte => "<=",
            Symbol::Gt => ">",
            Symbol::Gte => ">=",
        }
    }
}

/// Symbol spellings tried by the symbol sub-lexer. `!=` is accepted here and
/// canonicalised to `<>` in the emitted token.
const SYMBOL_SPELLINGS: [&str; 14] = [
    ";", "*", ",", "(", ")", "=", "<>", "!=", "||", "+", "<", "<=", ">", ">=",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Symbol,
    Identifier,
    String,
    Numeric,
    Boolean,
    Null,
}

/// One lexed token. Two tokens compare equal when their kinds and lexemes
/// match; the location is carried for diagnostics only.
#[derive(Debug, Clone)]
pub struct Token {
    pub value: String,
    pub kind: TokenKind,
    pub loc: Location,
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.value == other.value
    }
}

impl Eq for Token {}

impl Token {
    pub fn keyword(k: Keyword) -> Token {
        Token {
            value: k.as_str().to_string(),
            kind: match k {
                Keyword::True | Keyword::False => TokenKind::Boolean,
                Keyword::Null => TokenKind::Null,
                _ => TokenKind::Keyword,
            },
            loc: Location::default(),
        }
    }

    pub fn symbol(s: Symbol) -> Token {
        Token {
            value: s.as_str().to_string(),
            kind: TokenKind::Symbol,
            loc: Location::default(),
        }
    }

    pub fn is_keyword(&self, k: Keyword) -> bool {
        self.kind == TokenKind::Keyword && self.value == k.as_str()
    }

    pub fn is_symbol(&self, s: Symbol) -> bool {
        self.kind == TokenKind::Symbol && self.value == s.as_str()
    }

    /// Left-associative binding power for the Pratt parser. Zero for tokens
    /// that are not binary operators.
    pub fn binding_power(&self) -> u32 {
        match self.kind {
            TokenKind::Keyword => match self.value.as_str() {
                "and" | "or" => 1,
                _ => 0,
            },
            TokenKind::Symbol => match self.value.as_str() {
                "=" | "<>" => 2,
                "<" | ">" => 3,
                "<=" | ">=" => 4,
                "||" | "+" => 5,
                _ => 0,
            },
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub loc: Location,
    /// Lexeme of the last token produced before the failure, when any.
    pub hint: Option<String>,
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.hint {
            Some(hint) => write!(
                f,
                "unable to lex token after {}, at {}:{}",
                hint, self.loc.line, self.loc.col
            ),
            None => write!(f, "unable to lex token at {}:{}", self.loc.line, self.loc.col),
        }
    }
}

impl std::error::Error for LexError {}

#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    pointer: usize,
    loc: Location,
}

fn advance_over(mut loc: Location, text: &str) -> Location {
    for b in text.bytes() {
        if b == b'\n' {
            loc.line += 1;
            loc.col = 0;
        } else {
            loc.col += 1;
        }
    }
    loc
}

type SubLexer = fn(&str, Cursor) -> Option<(Option<Token>, Cursor)>;

/// Tokenise `source`, or fail at the earliest offset no sub-lexer accepts.
pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    let lexers: [SubLexer; 5] = [lex_keyword, lex_symbol, lex_string, lex_numeric, lex_identifier];

    let mut tokens = Vec::new();
    let mut cur = Cursor::default();
    'outer: while cur.pointer < source.len() {
        for lexer in lexers {
            if let Some((token, new_cur)) = lexer(source, cur) {
                cur = new_cur;
                if let Some(token) = token {
                    tokens.push(token);
                }
                continue 'outer;
            }
        }
        return Err(LexError {
            loc: cur.loc,
            hint: tokens.last().map(|t| t.value.clone()),
        });
    }
    Ok(tokens)
}

/// Longest-match helper shared by the keyword and symbol sub-lexers.
///
/// One byte at a time is appended (case-folded) to a candidate prefix;
/// options that stop sharing the prefix are dropped, and the scan ends when
/// no option remains. The longest option that ever reached full equality
/// wins.
fn longest_match<'a>(source: &str, ic: Cursor, options: &[&'a str]) -> Option<&'a str> {
    let bytes = source.as_bytes();
    let mut value = String::new();
    let mut skip_list = vec![false; options.len()];
    let mut matched: Option<&'a str> = None;
    let mut pointer = ic.pointer;

    while pointer < bytes.len() {
        value.push(bytes[pointer].to_ascii_lowercase() as char);
        pointer += 1;

        let mut remaining = 0;
        for (i, option) in options.iter().enumerate() {
            if skip_list[i] {
                continue;
            }

            if *option == value {
                skip_list[i] = true;
                if matched.map_or(true, |m| option.len() > m.len()) {
                    matched = Some(option);
                }
                continue;
            }

            if value.len() >= option.len() || !option.starts_with(&value) {
                skip_list[i] = true;
                continue;
            }
            remaining += 1;
        }

        if remaining == 0 {
            break;
        }
    }

    matched
}

fn lex_keyword(source: &str, ic: Cursor) -> Option<(Option<Token>, Cursor)> {
    let options: Vec<&str> = Keyword::ALL.iter().map(|k| k.as_str()).collect();
    let matched = longest_match(source, ic, &options)?;

    let kind = match matched {
        "true" | "false" => TokenKind::Boolean,
        "null" => TokenKind::Null,
        _ => TokenKind::Keyword,
    };

    let mut cur = ic;
    cur.pointer += matched.len();
    cur.loc.col += matched.len() as u32;
    Some((
        Some(Token {
            value: matched.to_string(),
            kind,
            loc: ic.loc,
        }),
        cur,
    ))
}

fn lex_symbol(source: &str, ic: Cursor) -> Option<(Option<Token>, Cursor)> {
    let mut cur = ic;
    match source.as_bytes()[ic.pointer] {
        b'\n' => {
            cur.pointer += 1;
            cur.loc.line += 1;
            cur.loc.col = 0;
            return Some((None, cur));
        }
        b' ' | b'\t' => {
            cur.pointer += 1;
            cur.loc.col += 1;
            return Some((None, cur));
        }
        _ => {}
    }

    let matched = longest_match(source, ic, &SYMBOL_SPELLINGS)?;
    cur.pointer += matched.len();
    cur.loc.col += matched.len() as u32;

    // != is an alternate spelling, not a distinct operator.
    let value = if matched == "!=" {
        Symbol::Neq.as_str().to_string()
    } else {
        matched.to_string()
    };

    Some((
        Some(Token {
            value,
            kind: TokenKind::Symbol,
            loc: ic.loc,
        }),
        cur,
    ))
}

fn lex_string(source: &str, ic: Cursor) -> Option<(Option<Token>, Cursor)> {
    let (token, cur) = lex_character_delimited(source, ic, b'\'')?;
    Some((Some(token), cur))
}

/// Scan a run delimited by `delimiter`, collapsing doubled delimiters into
/// one. The emitted lexeme excludes the outer delimiters.
fn lex_character_delimited(source: &str, ic: Cursor, delimiter: u8) -> Option<(Token, Cursor)> {
    let bytes = source.as_bytes();
    if bytes.get(ic.pointer) != Some(&delimiter) {
        return None;
    }

    let mut value: Vec<u8> = Vec::new();
    let mut pointer = ic.pointer + 1;
    while pointer < bytes.len() {
        let c = bytes[pointer];
        if c == delimiter {
            if bytes.get(pointer + 1) == Some(&delimiter) {
                value.push(delimiter);
                pointer += 2;
                continue;
            }

            let mut cur = ic;
            cur.pointer = pointer + 1;
            cur.loc = advance_over(ic.loc, &source[ic.pointer..cur.pointer]);
            // Splices happen only at ASCII delimiter boundaries, so the
            // collected bytes are valid UTF-8 whenever the source is.
            let value = String::from_utf8(value).ok()?;
            return Some((
                Token {
                    value,
                    kind: TokenKind::String,
                    loc: ic.loc,
                },
                cur,
            ));
        }
        value.push(c);
        pointer += 1;
    }

    None
}

fn lex_numeric(source: &str, ic: Cursor) -> Option<(Option<Token>, Cursor)> {
    let bytes = source.as_bytes();
    let mut pointer = ic.pointer;
    let mut period_found = false;
    let mut exp_marker_found = false;
    let mut digit_found = false;

    while pointer < bytes.len() {
        let c = bytes[pointer];
        let is_digit = c.is_ascii_digit();
        let is_period = c == b'.';
        let is_exp_marker = c == b'e';

        // Must start with a digit or a period.
        if pointer == ic.pointer {
            if !is_digit && !is_period {
                return None;
            }
            period_found = is_period;
            digit_found = is_digit;
            pointer += 1;
            continue;
        }

        if is_period {
            if period_found {
                return None;
            }
            period_found = true;
            pointer += 1;
            continue;
        }

        if is_exp_marker {
            if exp_marker_found {
                return None;
            }

            // No periods after the exponent marker; the marker must be
            // followed by at least one digit, optionally signed.
            period_found = true;
            exp_marker_found = true;

            let mut next = pointer + 1;
            if next < bytes.len() && (bytes[next] == b'-' || bytes[next] == b'+') {
                next += 1;
            }
            if next >= bytes.len() || !bytes[next].is_ascii_digit() {
                return None;
            }
            pointer = next;
            continue;
        }

        if !is_digit {
            break;
        }
        digit_found = true;
        pointer += 1;
    }

    if pointer == ic.pointer || !digit_found {
        return None;
    }

    let mut cur = ic;
    cur.pointer = pointer;
    cur.loc.col += (pointer - ic.pointer) as u32;
    Some((
        Some(Token {
            value: source[ic.pointer..pointer].to_string(),
            kind: TokenKind::Numeric,
            loc: ic.loc,
        }),
        cur,
    ))
}

fn lex_identifier(source: &str, ic: Cursor) -> Option<(Option<Token>, Cursor)> {
    // Double-quoted identifiers keep their case and may contain anything a
    // string may, with "" collapsing to a single quote.
    if let Some((token, cur)) = lex_character_delimited(source, ic, b'"') {
        return Some((
            Some(Token {
                kind: TokenKind::Identifier,
                ..token
            }),
            cur,
        ));
    }

    let bytes = source.as_bytes();
    let c = bytes[ic.pointer];
    if !c.is_ascii_alphabetic() {
        return None;
    }

    let mut pointer = ic.pointer + 1;
    while pointer < bytes.len() {
        let c = bytes[pointer];
        if c.is_ascii_alphanumeric() || c == b'$' || c == b'_' {
            pointer += 1;
            continue;
        }
        break;
    }

    let mut cur = ic;
    cur.pointer = pointer;
    cur.loc.col += (pointer - ic.pointer) as u32;
    Some((
        Some(Token {
            value: source[ic.pointer..pointer].to_ascii_lowercase(),
            kind: TokenKind::Identifier,
            loc: ic.loc,
        }),
        cur,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_values(tokens: &[Token]) -> Vec<(TokenKind, &str)> {
        tokens.iter().map(|t| (t.kind, t.value.as_str())).collect()
    }

    #[test]
    fn lex_simple_select() {
        let tokens = lex("select a from users;").unwrap();
        assert_eq!(
            kinds_and_values(&tokens),
            vec![
                (TokenKind::Keyword, "select"),
                (TokenKind::Identifier, "a"),
                (TokenKind::Keyword, "from"),
                (TokenKind::Identifier, "users"),
                (TokenKind::Symbol, ";"),
            ]
        );
    }

    #[test]
    fn keywords_are_case_insensitive_and_folded() {
        let tokens = lex("SeLeCt FROM Where").unwrap();
        assert_eq!(
            kinds_and_values(&tokens),
            vec![
                (TokenKind::Keyword, "select"),
                (TokenKind::Keyword, "from"),
                (TokenKind::Keyword, "where"),
            ]
        );
    }

    #[test]
    fn longest_match_prefers_into_over_int() {
        let tokens = lex("insert into int").unwrap();
        assert_eq!(
            kinds_and_values(&tokens),
            vec![
                (TokenKind::Keyword, "insert"),
                (TokenKind::Keyword, "into"),
                (TokenKind::Keyword, "int"),
            ]
        );
    }

    #[test]
    fn primary_key_is_a_single_keyword() {
        let tokens = lex("id int primary key").unwrap();
        assert_eq!(
            kinds_and_values(&tokens),
            vec![
                (TokenKind::Identifier, "id"),
                (TokenKind::Keyword, "int"),
                (TokenKind::Keyword, "primary key"),
            ]
        );
    }

    #[test]
    fn boolean_and_null_get_their_own_kinds() {
        let tokens = lex("true false null").unwrap();
        assert_eq!(
            kinds_and_values(&tokens),
            vec![
                (TokenKind::Boolean, "true"),
                (TokenKind::Boolean, "false"),
                (TokenKind::Null, "null"),
            ]
        );
    }

    #[test]
    fn symbols_longest_match() {
        let tokens = lex("< <= > >= <> = || +").unwrap();
        assert_eq!(
            kinds_and_values(&tokens),
            vec![
                (TokenKind::Symbol, "<"),
                (TokenKind::Symbol, "<="),
                (TokenKind::Symbol, ">"),
                (TokenKind::Symbol, ">="),
                (TokenKind::Symbol, "<>"),
                (TokenKind::Symbol, "="),
                (TokenKind::Symbol, "||"),
                (TokenKind::Symbol, "+"),
            ]
        );
    }

    #[test]
    fn bang_equals_is_canonicalised() {
        let tokens = lex("a != b").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Symbol);
        assert_eq!(tokens[1].value, "<>");
    }

    #[test]
    fn accepted_numeric_forms() {
        for value in [
            "123", "123.", "123.145", "1e5", "1.e21", "1.1e2", "1.1e-2", "1.1e+2", "1e-1", ".1",
            "4.",
        ] {
            let tokens = lex(value).unwrap_or_else(|e| panic!("{value}: {e}"));
            assert_eq!(tokens.len(), 1, "{value}");
            assert_eq!(tokens[0].kind, TokenKind::Numeric, "{value}");
            assert_eq!(tokens[0].value, value);
        }
    }

    #[test]
    fn rejected_numeric_forms() {
        // Neither input starts like a number, so no other sub-lexer can
        // take over and the whole scan fails.
        for value in ["1..", "1ee4", "1e+"] {
            assert!(lex(value).is_err(), "{value} should not lex");
        }
        // "e4" is rejected by the numeric sub-lexer but is a fine bare
        // identifier.
        let tokens = lex("e4").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].value, "e4");
    }

    #[test]
    fn numeric_lexeme_stops_at_terminator() {
        let tokens = lex("1e5 x").unwrap();
        assert_eq!(tokens[0].value, "1e5");
        assert_eq!(tokens[1].value, "x");
    }

    #[test]
    fn keywords_match_as_prefixes() {
        // The keyword sub-lexer runs before the identifier sub-lexer and
        // matches prefixes, so a keyword glued to trailing input splits.
        let tokens = lex("select1").unwrap();
        assert_eq!(
            kinds_and_values(&tokens),
            vec![(TokenKind::Keyword, "select"), (TokenKind::Numeric, "1")]
        );
    }

    #[test]
    fn string_with_escaped_quote() {
        let tokens = lex("'a''b'").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].value, "a'b");
    }

    #[test]
    fn empty_string_literal() {
        let tokens = lex("''").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].value, "");
    }

    #[test]
    fn unterminated_string_fails() {
        assert!(lex("'abc").is_err());
    }

    #[test]
    fn bare_identifiers_fold_to_lowercase() {
        let tokens = lex("UsErS u$1 a_b").unwrap();
        assert_eq!(
            kinds_and_values(&tokens),
            vec![
                (TokenKind::Identifier, "users"),
                (TokenKind::Identifier, "u$1"),
                (TokenKind::Identifier, "a_b"),
            ]
        );
    }

    #[test]
    fn quoted_identifiers_preserve_case_and_escapes() {
        let tokens = lex(r#""MixedCase" "a""b""#).unwrap();
        assert_eq!(
            kinds_and_values(&tokens),
            vec![
                (TokenKind::Identifier, "MixedCase"),
                (TokenKind::Identifier, "a\"b"),
            ]
        );
    }

    #[test]
    fn locations_track_lines_and_columns() {
        let tokens = lex("select 1\nfrom t").unwrap();
        assert_eq!(tokens[0].loc, Location { line: 0, col: 0 });
        assert_eq!(tokens[1].loc, Location { line: 0, col: 7 });
        assert_eq!(tokens[2].loc, Location { line: 1, col: 0 });
        assert_eq!(tokens[3].loc, Location { line: 1, col: 5 });
    }

    #[test]
    fn token_equality_ignores_location() {
        let a = Token {
            value: "select".to_string(),
            kind: TokenKind::Keyword,
            loc: Location { line: 3, col: 9 },
        };
        assert_eq!(a, Token::keyword(Keyword::Select));
    }

    #[test]
    fn lex_error_carries_location_and_hint() {
        let err = lex("select @").unwrap_err();
        assert_eq!(err.loc, Location { line: 0, col: 7 });
        assert_eq!(err.hint.as_deref(), Some("select"));
    }

    #[test]
    fn binding_powers_match_operator_table() {
        let bp = |t: Token| t.binding_power();
        assert_eq!(bp(Token::keyword(Keyword::And)), 1);
        assert_eq!(bp(Token::keyword(Keyword::Or)), 1);
        assert_eq!(bp(Token::symbol(Symbol::Eq)), 2);
        assert_eq!(bp(Token::symbol(Symbol::Neq)), 2);
        assert_eq!(bp(Token::symbol(Symbol::Lt)), 3);
        assert_eq!(bp(Token::symbol(Symbol::Gt)), 3);
        assert_eq!(bp(Token::symbol(Symbol::Lte)), 4);
        assert_eq!(bp(Token::symbol(Symbol::Gte)), 4);
        assert_eq!(bp(Token::symbol(Symbol::Concat)), 5);
        assert_eq!(bp(Token::symbol(Symbol::Plus)), 5);
        assert_eq!(bp(Token::symbol(Symbol::Semicolon)), 0);
    }

    #[test]
    fn whole_statement_with_every_literal_kind() {
        let tokens = lex("insert into t values (1, 'x', true, null);").unwrap();
        assert_eq!(
            kinds_and_values(&tokens),
            vec![
                (TokenKind::Keyword, "insert"),
                (TokenKind::Keyword, "into"),
                (TokenKind::Identifier, "t"),
                (TokenKind::Keyword, "values"),
                (TokenKind::Symbol, "("),
                (TokenKind::Numeric, "1"),
                (TokenKind::Symbol, ","),
                (TokenKind::String, "x"),
                (TokenKind::Symbol, ","),
                (TokenKind::Boolean, "true"),
                (TokenKind::Symbol, ","),
                (TokenKind::Null, "null"),
                (TokenKind::Symbol, ")"),
                (TokenKind::Symbol, ";"),
            ]
        );
    }
}
