pub mod buffer;
pub mod score;
pub mod sigs;
pub mod ops;
pub mod engine;
pub mod report;

pub use buffer::ByteBuffer;
pub use engine::{AnalysisReport, Candidate, CancelToken, EngineError, Magic, MagicConfig};
pub use ops::{DataType, OpArg, OpError, OperationDescriptor, OperationRegistry, TableRegistry};
pub use score::{Crib, Score};
pub use sigs::{EncodingHit, FileTypeMatch, SignatureCatalogue};
