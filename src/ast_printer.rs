use crate::ast::{Expr, LiteralValue};

/// Converts an expression to the CodeCrafters/Crafting‑Interpreters
/// prefix form (no heap allocations except `String` joins for output).
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        // 3 → 3.0
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }
            },

            // ── grouping ────────────────────────────────────────────────
            Expr::Grouping(inner) => format!("(group {})", Self::print(inner)),

            // ── unary operator ──────────────────────────────────────────
            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            // ── binary / logical operator ──────────────────────────────
            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => format!(
                "(?: {} {} {})",
                Self::print(condition),
                Self::print(then_branch),
                Self::print(else_branch)
            ),

            // ── names ───────────────────────────────────────────────────
            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::This { .. } => "this".into(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            // ── properties ──────────────────────────────────────────────
            Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(.= {} {} {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut s = format!("(call {}", Self::print(callee));
                for arg in arguments {
                    s.push(' ');
                    s.push_str(&Self::print(arg));
                }
                s.push(')');
                s
            }

            Expr::Function(decl) => {
                let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme.as_str()).collect();
                format!("(fun ({}))", params.join(" "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AstPrinter;
    use crate::parser::Parser;
    use crate::scanner::scan;

    fn print(source: &str) -> String {
        let (tokens, lex_errors) = scan(source);
        assert!(lex_errors.is_empty());

        let (expr, errors) = Parser::new(&tokens).parse_expression();
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);

        AstPrinter::print(&expr.expect("expression"))
    }

    #[test]
    fn precedence_is_visible_in_prefix_form() {
        assert_eq!(print("1 + 2 * 3"), "(+ 1.0 (* 2.0 3.0))");
        assert_eq!(print("-(1 - 2) >= 4"), "(>= (- (group (- 1.0 2.0))) 4.0)");
    }

    #[test]
    fn conditional_is_right_associative() {
        assert_eq!(print("a ? b : c ? d : e"), "(?: a b (?: c d e))");
    }

    #[test]
    fn comma_binds_loosest() {
        assert_eq!(print("a = 1, b = 2"), "(, (= a 1.0) (= b 2.0))");
    }

    #[test]
    fn property_chains_and_calls() {
        assert_eq!(print("a.b(1, 2).c = 3"), "(.= (call (. a b) 1.0 2.0) c 3.0)");
    }
}
