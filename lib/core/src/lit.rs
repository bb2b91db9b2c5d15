use std::fmt::{Display, Formatter};
use std::ops::Neg;
use std::str::FromStr;

/// Signed DIMACS literal. Never zero: the zero terminator is not a literal.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct Lit(i32);

impl Lit {
    pub const fn new(val: i32) -> Self {
        debug_assert!(val != 0, "literal must not be zero");
        Lit(val)
    }

    pub const fn get(self) -> i32 {
        self.0
    }

    pub const fn var(self) -> u32 {
        self.get().unsigned_abs()
    }

    pub const fn is_negated(self) -> bool {
        self.get() < 0
    }
}

impl Display for Lit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl From<i32> for Lit {
    fn from(val: i32) -> Self {
        Self::new(val)
    }
}

// Into<i32>
impl From<Lit> for i32 {
    fn from(lit: Lit) -> Self {
        lit.get()
    }
}

// -Lit
impl Neg for Lit {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.0)
    }
}

/// Token of a DIMACS clause line: either a literal or the `0` terminator.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Token {
    Lit(Lit),
    End,
}

impl FromStr for Token {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i32 = s.parse()?;
        if value == 0 {
            Ok(Token::End)
        } else {
            Ok(Token::Lit(Lit::new(value)))
        }
    }
}
