mod tests_targets;
