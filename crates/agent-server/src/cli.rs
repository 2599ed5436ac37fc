//! Command-line arguments for `customer-lookup`.

use clap::Parser;
use clap::builder::RangedU64ValueParser;

pub const DEFAULT_EMAIL: &str = "jane.smith@example.com";

/// Look up a customer and their purchases by email, printing the result as JSON
#[derive(Debug, Parser)]
#[command(name = "customer-lookup", version, about, long_about = None)]
pub struct LookupArgs {
    /// Customer email address
    #[arg(default_value = DEFAULT_EMAIL)]
    pub email: String,

    /// Round budget for the agent run
    #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub max_rounds: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = LookupArgs::try_parse_from(["customer-lookup"]).unwrap();
        assert_eq!(args.email, DEFAULT_EMAIL);
        assert_eq!(args.max_rounds, None);
    }

    #[test]
    fn test_email_and_round_budget() {
        let args =
            LookupArgs::try_parse_from(["customer-lookup", "bob.wilson@example.com", "--max-rounds", "3"]).unwrap();
        assert_eq!(args.email, "bob.wilson@example.com");
        assert_eq!(args.max_rounds, Some(3));
    }

    #[test]
    fn test_flags_are_not_emails() {
        let help = LookupArgs::try_parse_from(["customer-lookup", "--help"]).unwrap_err();
        assert_eq!(help.kind(), clap::error::ErrorKind::DisplayHelp);

        let zero = LookupArgs::try_parse_from(["customer-lookup", "--max-rounds", "0"]).unwrap_err();
        assert_eq!(zero.kind(), clap::error::ErrorKind::ValueValidation);

        assert!(LookupArgs::try_parse_from(["customer-lookup", "--verbose"]).is_err());
    }
}
