mod queue_unit;
mod tasks_unit;
