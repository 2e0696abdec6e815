mod chain_tests;
mod finality_tests;
