mod queue;
mod robot;
