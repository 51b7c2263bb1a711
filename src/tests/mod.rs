mod test_adversarial;
mod test_decimal;
mod test_fixed;
mod test_schema;
