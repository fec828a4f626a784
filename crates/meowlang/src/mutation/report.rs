use crate::mutation::{Mutant, RunResult};
use std::io::{self, Write};

/// Writes the mutation testing results: totals, score, and one line per
/// surviving mutant with its description and position.
pub fn report(w: &mut dyn Write, mutants: &[Mutant], results: &[RunResult]) -> io::Result<()> {
    let killed = results.iter().filter(|r| r.killed).count();
    let survived = results.len() - killed;
    let total = results.len();
    let score = if total > 0 {
        killed as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    writeln!(w)?;
    writeln!(w, "=== Mutation Test Results ===")?;
    writeln!(w, "Total mutants: {total}")?;
    writeln!(w, "Killed: {killed}")?;
    writeln!(w, "Survived: {survived}")?;
    writeln!(w, "Mutation score: {score:.1}%")?;

    if survived > 0 {
        writeln!(w)?;
        writeln!(w, "--- Surviving Mutants ---")?;
        for result in results.iter().filter(|r| !r.killed) {
            if let Some(mutant) = mutants.iter().find(|m| m.id == result.id) {
                writeln!(w, "  [{}] {} ({})", mutant.id, mutant.description, mutant.pos)?;
            }
        }
    }
    writeln!(w)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::mutation::enumerate;
    use crate::parser;

    #[test]
    fn report_shape() {
        let (program, _) = parser::parse(Lexer::new("nyan x = 1 + 2", "r.nyan"));
        let mutants = enumerate(&program);
        let results: Vec<RunResult> = mutants
            .iter()
            .map(|m| RunResult {
                id: m.id,
                killed: m.id % 2 == 0,
            })
            .collect();
        let mut out = Vec::new();
        report(&mut out, &mutants, &results).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("=== Mutation Test Results ==="));
        assert!(text.contains(&format!("Total mutants: {}", mutants.len())));
        assert!(text.contains("--- Surviving Mutants ---"));
    }

    #[test]
    fn all_killed_hides_the_survivor_section() {
        let (program, _) = parser::parse(Lexer::new("nyan x = 1", "r.nyan"));
        let mutants = enumerate(&program);
        let results: Vec<RunResult> = mutants
            .iter()
            .map(|m| RunResult {
                id: m.id,
                killed: true,
            })
            .collect();
        let mut out = Vec::new();
        report(&mut out, &mutants, &results).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Mutation score: 100.0%"));
        assert!(!text.contains("Surviving"));
    }
}
