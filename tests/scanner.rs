#[cfg(test)]
mod scanner_tests {
    use pretty_assertions::assert_eq;

    use rox::error::LoxError;
    use rox::scanner::*;
    use rox::token::*;

    /// Kinds and lexemes of every token `source` scans to, errors dropped.
    fn lexed(source: &str) -> Vec<(TokenType, String)> {
        Scanner::new(source)
            .filter_map(|r| r.ok())
            .map(|t| (t.token_type, t.lexeme))
            .collect()
    }

    fn expect(source: &str, expected: &[(TokenType, &str)]) {
        let expected: Vec<(TokenType, String)> = expected
            .iter()
            .map(|(kind, lexeme)| (kind.clone(), lexeme.to_string()))
            .collect();

        assert_eq!(lexed(source), expected);
    }

    #[test]
    fn test_scanner_01_symbols() {
        expect(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_conditional_and_keywords() {
        expect(
            "val x = a ? b : c; break continue input",
            &[
                (TokenType::VAL, "val"),
                (TokenType::IDENTIFIER, "x"),
                (TokenType::EQUAL, "="),
                (TokenType::IDENTIFIER, "a"),
                (TokenType::QUESTION, "?"),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::COLON, ":"),
                (TokenType::IDENTIFIER, "c"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::BREAK, "break"),
                (TokenType::CONTINUE, "continue"),
                (TokenType::INPUT, "input"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_get_and_set_are_identifiers() {
        expect(
            "get set getter",
            &[
                (TokenType::IDENTIFIER, "get"),
                (TokenType::IDENTIFIER, "set"),
                (TokenType::IDENTIFIER, "getter"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_literals_and_lines() {
        let (tokens, errors) = scan("// comment\n12.5 \"two\nlines\" 7");
        assert!(errors.is_empty());

        let rendered: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "NUMBER 12.5 12.5".to_string(),
                "STRING \"two\nlines\" two\nlines".to_string(),
                "NUMBER 7 7.0".to_string(),
                "EOF  null".to_string(),
            ]
        );
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[2].line, 3);
    }

    #[test]
    fn test_scanner_05_unterminated_string() {
        let (tokens, errors) = scan("\"open");

        assert_eq!(tokens.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "[line 1] Error: Unterminated string.");
    }

    #[test]
    fn test_scanner_06_comments_of_both_kinds() {
        expect(
            "a // to end of line\n/* across\nlines */ b",
            &[
                (TokenType::IDENTIFIER, "a"),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_07_bad_characters_do_not_stop_the_scan() {
        let results: Vec<_> = Scanner::new(",.$(#").collect();

        // COMMA DOT <err> LEFT_PAREN <err> EOF
        let shape: Vec<bool> = results.iter().map(|r| r.is_ok()).collect();
        assert_eq!(shape, vec![true, true, false, true, false, true]);

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(matches!(err, LoxError::Lex { line: 1, .. }));
            assert!(
                err.to_string().contains("Unexpected character"),
                "got: {}",
                err
            );
        }

        assert_eq!(
            lexed(",.$(#").last(),
            Some(&(TokenType::EOF, String::new()))
        );
    }

    #[test]
    fn test_scanner_08_iterator_is_fused() {
        let mut scanner = Scanner::new("x");

        assert!(scanner.next().is_some());
        assert!(scanner.next().is_some());
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }
}
