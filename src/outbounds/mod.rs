/// +----------------------------------------------------------+
/// | MODULES                                                  |
/// +----------+-------+-------+------------------------------+
/// | Exports:                                                 |
/// |   - bridge        (broker bridge event hub)              |
/// |   - memory_store  (in-memory state store)                |
/// |   - seed          (player roster loader)                 |
/// +----------------------------------------------------------+

/// Event hub backed by a durable topic.
pub mod bridge;

/// State store keeping the draft in process memory.
pub mod memory_store;

pub mod seed;
