pub mod anchor_client;

pub use anchor_client::AnchorClient;
