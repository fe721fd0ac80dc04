pub mod config;
pub mod debrid;
pub mod episodes;
pub mod pipeline;
pub mod player;
pub mod positions;
pub mod release;
pub mod torznab;
