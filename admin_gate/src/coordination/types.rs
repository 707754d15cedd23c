use serde::{Deserialize, Serialize};

use crate::utils::{UtilError, gen_random_u32};

/// Network or session identity of the caller; the lockout tracker keys on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client-mirrored login progression. Strictly linear; the only way back is
/// a full restart of the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginFlowState {
    AwaitingSecret,
    AwaitingPossessionOrOtp,
    AwaitingHumanCheck,
    Authenticated,
}

impl LoginFlowState {
    /// The state after the current step succeeds. `Authenticated` is
    /// terminal and maps to itself.
    pub fn advance(self) -> Self {
        match self {
            Self::AwaitingSecret => Self::AwaitingPossessionOrOtp,
            Self::AwaitingPossessionOrOtp => Self::AwaitingHumanCheck,
            Self::AwaitingHumanCheck => Self::Authenticated,
            Self::Authenticated => Self::Authenticated,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Authenticated
    }
}

/// Successful secret verification: the minted bearer token plus how many
/// credentials already exist (the client uses the count to decide between
/// offering registration and login).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifySecretSuccess {
    pub registration_token: String,
    pub passkey_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOp {
    Add,
    Sub,
    Mul,
}

impl MathOp {
    fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
        }
    }

    fn apply(self, a: i64, b: i64) -> i64 {
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
        }
    }
}

/// An arithmetic human-verification challenge. Exact match required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanCheck {
    pub expression: String,
    pub expected: i64,
}

impl HumanCheck {
    /// First operand in [10, 30), second in [1, 10], random operator.
    pub fn generate() -> Result<Self, UtilError> {
        let n1 = gen_random_u32(10, 30)? as i64;
        let n2 = gen_random_u32(1, 11)? as i64;
        let op = match gen_random_u32(0, 3)? {
            0 => MathOp::Add,
            1 => MathOp::Sub,
            _ => MathOp::Mul,
        };
        Ok(Self::from_parts(n1, n2, op))
    }

    pub fn from_parts(n1: i64, n2: i64, op: MathOp) -> Self {
        Self {
            expression: format!("{n1} {} {n2}", op.symbol()),
            expected: op.apply(n1, n2),
        }
    }
}
