mod pipeline;
mod queue_processor;
