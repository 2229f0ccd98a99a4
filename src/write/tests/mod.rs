mod tests_atomic;
