pub mod ai_client;
pub mod devops_client;
pub mod ticket_provider;


pub use ai_client::{ChatModel, OpenAIChatModel};
pub use devops_client::DevOpsClient;
pub use ticket_provider::{fetch_tickets_batched, TicketProvider};
