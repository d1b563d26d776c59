mod command;
mod registry;
