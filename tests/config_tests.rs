//! Layered configuration loading
//!
//! Environment variables are process-wide, so every env case runs inside one
//! test in this binary.

#[cfg(test)]
mod tests {
    use std::env;

    use fairline::config::AppConfig;

    const VARS: [&str; 4] = [
        "FAIRLINE__POSTING__TARGET_EV",
        "FAIRLINE__POSTING__COMMISSION_RATE",
        "FAIRLINE__REFERENCE_BOOKS__BOOKS",
        "FAIRLINE__REFERENCE_BOOKS__MIN_BOOKS",
    ];

    fn clear() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    // ============================================================================
    // Environment overrides
    // ============================================================================

    #[test]
    fn environment_overrides_files_and_defaults() {
        clear();

        let base = AppConfig::load().unwrap();
        assert_eq!(
            base.reference_books.books,
            vec!["pinnacle", "circa", "bookmaker"]
        );
        assert!((base.posting.target_ev - 0.025).abs() < 1e-12);

        env::set_var("FAIRLINE__POSTING__TARGET_EV", "0.03");
        env::set_var("FAIRLINE__POSTING__COMMISSION_RATE", "0.05");
        env::set_var("FAIRLINE__REFERENCE_BOOKS__BOOKS", "a,b");
        let cfg = AppConfig::load().unwrap();
        assert!((cfg.posting.target_ev - 0.03).abs() < 1e-12);
        assert!((cfg.posting.commission_rate - 0.05).abs() < 1e-12);
        assert_eq!(cfg.reference_books.books, vec!["a", "b"]);
        assert_eq!(cfg.fair_odds_engine().reference_books(), ["a", "b"]);

        env::set_var("FAIRLINE__REFERENCE_BOOKS__MIN_BOOKS", "1");
        let err = AppConfig::load().unwrap_err();
        assert!(err.to_string().contains("min_books"), "{err}");

        clear();
    }
}
