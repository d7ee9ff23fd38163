//! Utterance normalisation shared by the classifier, extractor, and resolver.

/// A single word of an utterance, lowercased for matching while keeping the
/// customer's original spelling for names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub original: String,
}

impl Token {
    pub fn is_capitalized(&self) -> bool {
        self.original.chars().next().is_some_and(char::is_uppercase)
    }

    pub fn is_alphabetic(&self) -> bool {
        !self.text.is_empty() && self.text.chars().all(|character| character.is_alphabetic())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utterance {
    raw: String,
    tokens: Vec<Token>,
}

impl Utterance {
    pub fn new(raw: &str) -> Self {
        Self { raw: raw.trim().to_string(), tokens: tokenize(raw) }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(|token| token.text.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Index of the first occurrence of `phrase` as a contiguous run of whole
    /// tokens. The phrase is normalised the same way utterances are.
    pub fn find_phrase(&self, phrase: &str) -> Option<usize> {
        let needle = tokenize(phrase);
        if needle.is_empty() || needle.len() > self.tokens.len() {
            return None;
        }

        self.tokens.windows(needle.len()).position(|window| {
            window.iter().zip(&needle).all(|(token, expected)| token.text == expected.text)
        })
    }

    pub fn contains_phrase(&self, phrase: &str) -> bool {
        self.find_phrase(phrase).is_some()
    }
}

/// Splits on anything that is not part of a word, a clock time, or a numeric
/// date. Apostrophes are dropped so "I'm" becomes "im", and "p.m." collapses
/// to "pm".
fn tokenize(raw: &str) -> Vec<Token> {
    let collapsed = collapse_meridiem_dots(raw);
    let characters = collapsed.chars().collect::<Vec<_>>();
    let mut sanitized = String::with_capacity(characters.len());

    for (index, character) in characters.iter().copied().enumerate() {
        let previous_digit = index > 0 && characters[index - 1].is_ascii_digit();
        let next_digit = characters.get(index + 1).is_some_and(char::is_ascii_digit);

        if character.is_alphanumeric() {
            sanitized.push(character);
        } else if matches!(character, '\'' | '\u{2019}') {
            continue;
        } else if matches!(character, ':' | '/' | '-' | '.') && previous_digit && next_digit {
            sanitized.push(character);
        } else {
            sanitized.push(' ');
        }
    }

    sanitized
        .split_whitespace()
        .map(|word| Token { text: word.to_lowercase(), original: word.to_string() })
        .collect()
}

fn collapse_meridiem_dots(raw: &str) -> String {
    let mut output = raw.to_string();
    for (dotted, plain) in [("a.m.", "am"), ("p.m.", "pm"), ("A.M.", "am"), ("P.M.", "pm")] {
        output = output.replace(dotted, plain);
    }
    output
}

/// Parses small counts written as digits or English number words.
pub fn parse_count(word: &str) -> Option<u32> {
    if let Ok(value) = word.parse::<u32>() {
        return Some(value);
    }

    let value = match word {
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "thirteen" => 13,
        "fourteen" => 14,
        "fifteen" => 15,
        "sixteen" => 16,
        "seventeen" => 17,
        "eighteen" => 18,
        "nineteen" => 19,
        "twenty" => 20,
        _ => return None,
    };
    Some(value)
}
