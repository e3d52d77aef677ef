pub mod agent_tree;
pub mod mock_client;
