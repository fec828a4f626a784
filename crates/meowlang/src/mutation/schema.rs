use crate::ast::{Expr, ExprId, Program};
use crate::diagnostics::Failure;
use crate::mutation::{find_expr, Mutant, MutantId};
use std::collections::HashMap;

/// One alternative form for an instrumented expression site.
#[derive(Debug, Clone)]
pub struct MutationEntry {
    pub id: MutantId,
    /// Structural snapshot of the replacement expression.
    pub expr: Expr,
}

/// Original expression site → the alternative forms a super-binary selects
/// between via `MEOW_MUTANT`.
pub type MutationSchema = HashMap<ExprId, Vec<MutationEntry>>;

/// Builds the schema the back-end embeds into a super-binary: each mutant
/// is applied, the mutated expression is snapshotted, and the mutant is
/// undone. Swap-style kinds record the mutated node, removal kinds record
/// the surviving child subtree, and the negate/return-nil kinds record
/// their synthetic replacements.
pub fn build_schema(program: &mut Program, mutants: &[Mutant]) -> Result<MutationSchema, Failure> {
    let mut schema: MutationSchema = HashMap::new();
    for mutant in mutants {
        mutant.apply(program)?;
        let snapshot = find_expr(program, mutant.applied_site()).ok_or_else(|| {
            Failure::internal(format!(
                "mutant {} left no expression at its site",
                mutant.id
            ))
        })?;
        mutant.undo(program)?;
        schema.entry(mutant.target()).or_default().push(MutationEntry {
            id: mutant.id,
            expr: snapshot,
        });
    }
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinOp, Expr};
    use crate::lexer::Lexer;
    use crate::mutation::enumerate;
    use crate::parser;

    #[test]
    fn schema_snapshots_the_mutated_forms() {
        let (mut program, errors) = parser::parse(Lexer::new("nyan x = 1 + 2", "s.nyan"));
        assert!(errors.is_empty());
        let mutants = enumerate(&program);
        let schema = build_schema(&mut program, &mutants).unwrap();

        // Every mutant contributed exactly one entry.
        let total: usize = schema.values().map(Vec::len).sum();
        assert_eq!(total, mutants.len());

        // The arithmetic swap entry holds the swapped operator.
        let swap = mutants
            .iter()
            .find(|m| m.description.starts_with("swap"))
            .unwrap();
        let entry = schema[&swap.target()]
            .iter()
            .find(|e| e.id == swap.id)
            .unwrap();
        match &entry.expr {
            Expr::Binary(b) => assert_eq!(b.op, BinOp::Sub),
            other => panic!("expected a binary snapshot, got {other:?}"),
        }

        // Building the schema left the program untouched.
        let after = enumerate(&program);
        assert_eq!(after.len(), mutants.len());
        for (a, b) in mutants.iter().zip(&after) {
            assert_eq!(a.description, b.description);
        }
    }

    #[test]
    fn removal_kinds_record_the_surviving_child() {
        let (mut program, errors) =
            parser::parse(Lexer::new("nyan r = [1, 2] |=| head", "s.nyan"));
        assert!(errors.is_empty());
        let mutants = enumerate(&program);
        let pipe_removal = mutants
            .iter()
            .find(|m| m.description.starts_with("remove pipe"))
            .unwrap();
        let schema = build_schema(&mut program, &mutants).unwrap();
        let entry = schema[&pipe_removal.target()]
            .iter()
            .find(|e| e.id == pipe_removal.id)
            .unwrap();
        assert!(matches!(entry.expr, Expr::List(_)));
    }
}
