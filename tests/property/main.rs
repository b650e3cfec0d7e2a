mod backoff;
mod filter;
mod payload;
mod queue;
