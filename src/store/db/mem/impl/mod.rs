mod connection;
mod credential;
mod execution;
mod node;
mod workflow;
