use thiserror::Error;

macro_rules! shape_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Shape {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Shape {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! eval_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Eval {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Eval {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers all failure modes of the patching engine: configuration/shape
/// mismatches discovered while scanning a host method, faults raised by the mini-IL
/// evaluator, and misuse of the substitution machinery. Each variant provides enough
/// context to identify the host method and position that triggered the failure.
///
/// # Error Categories
///
/// ## Patch Application Errors
/// - [`Error::Shape`] - The host method's instruction stream or generated-type shape
///   does not match what the patch expects (host version incompatibility)
/// - [`Error::DuplicateLiteral`] - A substitution table was built with two entries for
///   the same default literal
/// - [`Error::MethodNotFound`] - A patch or call targeted a method the host does not define
///
/// ## Evaluation Errors
/// - [`Error::Eval`] - Stack underflow, type mismatch, or an undefined reference while
///   executing a method body
/// - [`Error::StepLimit`] - A method body failed to terminate within the step budget
#[derive(Error, Debug)]
pub enum Error {
    /// The host method's shape does not match what the patch expects.
    ///
    /// Raised when an expected instruction pattern or a compiler-synthesized field
    /// (such as the state-machine back-reference) cannot be found. This is a fatal
    /// configuration error: the patch must not be applied at all rather than applied
    /// against the wrong instance or position.
    ///
    /// # Fields
    ///
    /// * `message` - The exact search context (method name, cursor index, missing field)
    /// * `file` - Source file where the mismatch was detected
    /// * `line` - Source line where the mismatch was detected
    #[error("Shape mismatch - {file}:{line}: {message}")]
    Shape {
        /// The message to be printed for the shape mismatch
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A method body faulted during evaluation.
    ///
    /// Raised by the evaluator for stack underflow, operand type mismatches,
    /// branches to undefined labels, or references to undefined fields. Host
    /// bodies shipped with this crate are well-formed; this error indicates a
    /// hand-built body in a test or a patch that corrupted the stack discipline.
    #[error("Evaluation fault - {file}:{line}: {message}")]
    Eval {
        /// The message to be printed for the evaluation fault
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A substitution table already contains an entry for this literal.
    ///
    /// Substitution keys are the host's default literal values and must be unique
    /// within one target method; a duplicate would make the replacement ambiguous.
    #[error("Duplicate substitution literal - {0}")]
    DuplicateLiteral(String),

    /// The named method does not exist in the host's method table.
    ///
    /// Raised when installing a patch against, or dispatching a call to, a method
    /// the host does not define.
    #[error("Method not found - {0}")]
    MethodNotFound(String),

    /// A method body exceeded the evaluation step budget.
    ///
    /// Protects the cooperative scheduler from a body that loops forever. The
    /// associated value is the step budget that was exhausted.
    #[error("Evaluation exceeded the step budget of {0}")]
    StepLimit(usize),

    /// Generic error for miscellaneous failures.
    ///
    /// Used for errors that don't fit into other categories.
    #[error("{0}")]
    Error(String),
}
