// Local control socket for the block host: length-prefixed JSON frames,
// one client at a time, error notifications pushed unsolicited.

pub mod protocol;
pub mod server;

pub use protocol::{ComponentRequest, RadioRequest, RadioRequestType, RadioResponse, RadioResponseType};
pub use server::{IpcServer, RequestHandler};
