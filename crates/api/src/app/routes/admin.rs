pub async fn admin_page() -> &'static str {
    "Admin page"
}
