/// Loads variables from a `.env` file when one exists. Absence is fine;
/// hosted setups inject real environment variables instead.
pub fn load_dotenvy_vars_if_present() {
    dotenvy::dotenv().ok();
}
