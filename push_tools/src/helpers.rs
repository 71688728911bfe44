/// Errors the provider returns for tokens that will never work again. Callers should forget these tokens.
const STALE_TOKEN_ERRORS: [&str; 3] = ["NotRegistered", "InvalidRegistration", "MismatchSenderId"];

pub fn is_stale_token_error(error: &str) -> bool {
    STALE_TOKEN_ERRORS.contains(&error)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn only_permanent_errors_are_stale() {
        assert!(is_stale_token_error("NotRegistered"));
        assert!(is_stale_token_error("InvalidRegistration"));
        assert!(!is_stale_token_error("Unavailable"));
        assert!(!is_stale_token_error("InternalServerError"));
    }
}
