mod fees_test;
mod tick_math_test;
