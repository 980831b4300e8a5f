/// +----------------------------------------------------------+
/// | MODULES                                                  |
/// +----------+-------+-------+------------------------------+
/// | Exports:                                                 |
/// |   - rpc  (JSON-RPC 2.0 over WebSocket)                   |
/// |   - sse  (server-sent events)                            |
/// +----------------------------------------------------------+

pub mod rpc;
pub mod sse;
