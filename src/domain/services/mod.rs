/// +----------------------------------------------------------+
/// | MODULES                                                  |
/// +----------+-------+-------+------------------------------+
/// | Exports:                                                 |
/// |   - draft_engine                                         |
/// |   - events                                               |
/// |   - state_store                                          |
/// +----------------------------------------------------------+

pub mod draft_engine;
pub mod events;
pub mod state_store;
