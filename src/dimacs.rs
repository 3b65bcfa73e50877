use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum DimacsError {
    #[error("missing `p cnf` header")]
    MissingHeader,

    #[error("line {line}: malformed header {header:?}")]
    MalformedHeader { line: usize, header: String },

    #[error("line {line}: expected an integer literal, found {token:?}")]
    InvalidToken { line: usize, token: String },

    #[error("line {line}: literal {lit} outside the declared range [-{num_vars}, {num_vars}]")]
    LitOutOfRange {
        line: usize,
        lit: i32,
        num_vars: usize,
    },

    #[error("unterminated clause at end of input")]
    UnterminatedClause,
}

/// A parsed DIMACS CNF problem.
pub struct Dimacs {
    pub num_vars: usize,
    pub clauses: Vec<Vec<i32>>,
}

impl Dimacs {
    /// Parse a DIMACS CNF document. `c` lines are comments, the `p cnf`
    /// header is required, clauses are zero-terminated and may span lines.
    /// A `%` token ends the clause section (SATLIB benchmark convention).
    pub fn parse(input: &str) -> Result<Dimacs, DimacsError> {
        let mut header: Option<(usize, usize)> = None;
        let mut clauses = Vec::new();
        let mut current = Vec::new();

        'lines: for (line_idx, line) in input.lines().enumerate() {
            let line_no = line_idx + 1;
            let line = line.trim_start();

            if line.is_empty() || line.starts_with('c') {
                continue;
            }
            if line.starts_with('%') {
                break;
            }

            if let Some(rest) = line.strip_prefix('p') {
                if header.is_some() {
                    return Err(DimacsError::MalformedHeader {
                        line: line_no,
                        header: line.to_string(),
                    });
                }
                header = Some(parse_header(rest).ok_or_else(|| DimacsError::MalformedHeader {
                    line: line_no,
                    header: line.to_string(),
                })?);
                continue;
            }

            let (num_vars, _) = header.ok_or(DimacsError::MissingHeader)?;

            for token in line.split_whitespace() {
                if token == "%" {
                    break 'lines;
                }
                let lit: i32 = token.parse().map_err(|_| DimacsError::InvalidToken {
                    line: line_no,
                    token: token.to_string(),
                })?;

                if lit == 0 {
                    clauses.push(std::mem::take(&mut current));
                } else {
                    if lit.unsigned_abs() as usize > num_vars {
                        return Err(DimacsError::LitOutOfRange {
                            line: line_no,
                            lit,
                            num_vars,
                        });
                    }
                    current.push(lit);
                }
            }
        }

        let (num_vars, num_clauses) = header.ok_or(DimacsError::MissingHeader)?;
        if !current.is_empty() {
            return Err(DimacsError::UnterminatedClause);
        }
        if clauses.len() != num_clauses {
            warn!(
                "header declares {num_clauses} clauses, found {}",
                clauses.len()
            );
        }

        Ok(Dimacs { num_vars, clauses })
    }
}

fn parse_header(rest: &str) -> Option<(usize, usize)> {
    let mut tokens = rest.split_whitespace();
    let format = tokens.next()?;
    if format != "cnf" {
        return None;
    }
    let num_vars: usize = tokens.next()?.parse().ok()?;
    let num_clauses = tokens.next()?.parse().ok()?;
    if tokens.next().is_some() {
        return None;
    }
    // Variable numbers must stay representable as positive i32.
    if num_vars > i32::MAX as usize {
        return None;
    }
    Some((num_vars, num_clauses))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_test() {
        let dimacs = "\
        c test comment  \n\
        p cnf 3 4       \n\
        1 -2 -3 0       \n\
        2 3 1 0         \n\
        1 0             \n\
        2 0
        ";

        let result = Dimacs::parse(dimacs).unwrap();
        assert_eq!(result.num_vars, 3);
        assert_eq!(result.clauses[0], vec![1, -2, -3]);
        assert_eq!(result.clauses[1], vec![2, 3, 1]);
        assert_eq!(result.clauses[2], vec![1]);
        assert_eq!(result.clauses[3], vec![2]);
    }

    #[test]
    fn clauses_may_span_lines() {
        let dimacs = "p cnf 4 2\n1 2\n3 0 -2\n-4 0\n";
        let result = Dimacs::parse(dimacs).unwrap();
        assert_eq!(result.clauses, vec![vec![1, 2, 3], vec![-2, -4]]);
    }

    #[test]
    fn missing_header_is_an_error() {
        assert!(matches!(
            Dimacs::parse("1 2 0\n"),
            Err(DimacsError::MissingHeader)
        ));
        assert!(matches!(
            Dimacs::parse("c only comments\n"),
            Err(DimacsError::MissingHeader)
        ));
    }

    #[test]
    fn malformed_headers_are_rejected() {
        for input in ["p cnf\n", "p dnf 3 4\n", "p cnf three 4\n", "p cnf 3 4 5\n"] {
            assert!(matches!(
                Dimacs::parse(input),
                Err(DimacsError::MalformedHeader { .. })
            ));
        }
    }

    #[test]
    fn out_of_range_literal_is_an_error() {
        assert!(matches!(
            Dimacs::parse("p cnf 2 1\n1 -3 0\n"),
            Err(DimacsError::LitOutOfRange { lit: -3, .. })
        ));
    }

    #[test]
    fn junk_token_is_an_error() {
        assert!(matches!(
            Dimacs::parse("p cnf 2 1\n1 x 0\n"),
            Err(DimacsError::InvalidToken { .. })
        ));
    }

    #[test]
    fn unterminated_clause_is_an_error() {
        assert!(matches!(
            Dimacs::parse("p cnf 2 1\n1 2\n"),
            Err(DimacsError::UnterminatedClause)
        ));
    }

    #[test]
    fn percent_ends_the_clause_section() {
        let dimacs = "p cnf 2 1\n1 2 0\n%\n0\n";
        let result = Dimacs::parse(dimacs).unwrap();
        assert_eq!(result.clauses, vec![vec![1, 2]]);
    }

    #[test]
    fn empty_clause_is_parsed_not_rejected() {
        let result = Dimacs::parse("p cnf 1 2\n0\n1 0\n").unwrap();
        assert_eq!(result.clauses, vec![vec![], vec![1]]);
    }
}
