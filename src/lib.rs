// Backend do WishCo Branch Portal — เบิกอุปกรณ์ (requisição de equipamentos
// por sucursal). A "base de dados" é uma planilha Google Sheets acessada como
// abas nomeadas; ver store/ para o accessor e os backends.

pub mod common;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
