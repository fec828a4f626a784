use crate::ast::{preorder, Node, Program};
use crate::position::Position;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::Path;

/// A single instrumented statement.
#[derive(Debug, Clone)]
pub struct Block {
    pub file: String,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub num_stmt: u32,
    pub count: u64,
}

/// Statement-coverage tracker for interpreter runs.
///
/// Blocks are registered from statement positions before a run; the
/// interpreter reports hits as statements execute. The profile output is
/// Go-compatible: the caller writes the `mode: set` header once, and
/// [`Coverage::write_profile`] appends one
/// `file:startLine.col,endLine.col numStmt count` line per block.
#[derive(Debug, Default)]
pub struct Coverage {
    blocks: Vec<Block>,
    index: HashMap<Position, usize>,
}

impl Coverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one block per statement in the program.
    pub fn register_program(&mut self, program: &Program) {
        for node in preorder(program) {
            if let Node::Stmt(stmt) = node {
                self.register(stmt.pos());
            }
        }
    }

    fn register(&mut self, pos: &Position) {
        if self.index.contains_key(pos) {
            return;
        }
        let id = self.blocks.len();
        self.blocks.push(Block {
            file: pos.file.to_string(),
            start_line: pos.line,
            start_col: pos.column,
            end_line: pos.line,
            end_col: pos.column,
            num_stmt: 1,
            count: 0,
        });
        self.index.insert(pos.clone(), id);
    }

    /// Records an execution of the statement at `pos`.
    pub fn hit(&mut self, pos: &Position) {
        if let Some(&id) = self.index.get(pos) {
            self.blocks[id].count += 1;
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Percentage of statements with at least one hit.
    pub fn percent(&self) -> f64 {
        let total: u64 = self.blocks.iter().map(|b| u64::from(b.num_stmt)).sum();
        if total == 0 {
            return 0.0;
        }
        let covered: u64 = self
            .blocks
            .iter()
            .filter(|b| b.count > 0)
            .map(|b| u64::from(b.num_stmt))
            .sum();
        covered as f64 / total as f64 * 100.0
    }

    /// Writes the one-line coverage summary.
    pub fn report(&self, w: &mut dyn Write) -> io::Result<()> {
        if self.blocks.is_empty() {
            return Ok(());
        }
        writeln!(w, "coverage: {:.1}% of statements, nya~", self.percent())
    }

    /// Appends block lines in the Go profile format. The caller is
    /// responsible for the `mode: set` header.
    pub fn write_profile(&self, path: &Path) -> io::Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        for block in &self.blocks {
            let count = u64::from(block.count > 0);
            writeln!(
                file,
                "{}:{}.{},{}.{} {} {}",
                block.file,
                block.start_line,
                block.start_col,
                block.end_line,
                block.end_col,
                block.num_stmt,
                count
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser;

    fn program(source: &str) -> Program {
        let (program, errors) = parser::parse(Lexer::new(source, "cov.nyan"));
        assert!(errors.is_empty(), "{errors:?}");
        program
    }

    #[test]
    fn registers_every_statement_once() {
        let prog = program("nyan x = 1\nsniff (x > 0) {\n  nya(x)\n}");
        let mut cov = Coverage::new();
        cov.register_program(&prog);
        // nyan, sniff, and the nya expression statement.
        assert_eq!(cov.blocks().len(), 3);
    }

    #[test]
    fn percent_reflects_hits() {
        let prog = program("nyan x = 1\nnyan y = 2");
        let mut cov = Coverage::new();
        cov.register_program(&prog);
        assert_eq!(cov.percent(), 0.0);
        cov.hit(prog.stmts[0].pos());
        assert!((cov.percent() - 50.0).abs() < f64::EPSILON);
        cov.hit(prog.stmts[1].pos());
        assert!((cov.percent() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn report_line_shape() {
        let prog = program("nyan x = 1");
        let mut cov = Coverage::new();
        cov.register_program(&prog);
        cov.hit(prog.stmts[0].pos());
        let mut out = Vec::new();
        cov.report(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "coverage: 100.0% of statements, nya~\n"
        );
    }
}
