use std::fmt::Display;
use std::str::FromStr;

use error_stack::Report;
use serde::{Deserialize, Serialize};

use crate::KernelError;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Borrowed,
    Returned,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Borrowed => "borrowed",
            LoanStatus::Returned => "returned",
        }
    }
}

impl Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanStatus {
    type Err = Report<KernelError>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "borrowed" => Ok(LoanStatus::Borrowed),
            "returned" => Ok(LoanStatus::Returned),
            other => Err(Report::new(KernelError::Internal)
                .attach_printable(format!("unknown loan status: {other}"))),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::entity::LoanStatus;
    use crate::KernelError;

    #[test]
    fn parse() {
        assert_eq!("borrowed".parse::<LoanStatus>().ok(), Some(LoanStatus::Borrowed));
        assert_eq!("returned".parse::<LoanStatus>().ok(), Some(LoanStatus::Returned));
        let error = "lost".parse::<LoanStatus>().unwrap_err();
        assert_eq!(error.current_context(), &KernelError::Internal);
    }
}
