use crate::error::SolveError;
use crate::problem::LinearProblem;
use crate::solution::SolvedProblem;

/// Submit-model / retrieve-values contract with an external solver.
///
/// Implementations block until the engine returns. A successful result holds
/// exactly one value per variable of `problem`; anything else is an error.
pub trait SolverGateway {
    /// Engine name for logs and error messages.
    fn name(&self) -> &str;

    fn solve(&self, problem: &LinearProblem) -> Result<SolvedProblem, SolveError>;
}

impl<G: SolverGateway + ?Sized> SolverGateway for &G {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn solve(&self, problem: &LinearProblem) -> Result<SolvedProblem, SolveError> {
        (**self).solve(problem)
    }
}

impl<G: SolverGateway + ?Sized> SolverGateway for Box<G> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn solve(&self, problem: &LinearProblem) -> Result<SolvedProblem, SolveError> {
        (**self).solve(problem)
    }
}
