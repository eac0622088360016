mod caddy;
mod metadata;
mod provider;
mod proxy;
mod redirect;

pub use caddy::*;
pub use metadata::*;
pub use provider::*;
pub use proxy::*;
pub use redirect::*;
