//! Message types understood by the Naji host.

// Navigation
pub const OPEN_LINK: &str = "OPEN_LINK";
pub const OPEN_NM_LINK: &str = "OPEN_NM_LINK";
pub const DOWNLOAD_FILE: &str = "DOWNLOAD_FILE";

// UI and window
pub const APP_READY: &str = "APP_READY";
pub const SHOW_ALERT: &str = "SHOW_ALERT";
pub const SET_HEADER_COLOR: &str = "SET_HEADER_COLOR";
pub const SET_FULLSCREEN_APP: &str = "SET_FULLSCREEN_APP";
pub const BACK_BUTTON_UPDATE: &str = "BACK_BUTTON_UPDATE";
pub const CHECK_IS_ACTIVE: &str = "CHECK_IS_ACTIVE";

// Cloud storage, scoped to the user and the mini-app
pub const STORAGE_SET: &str = "STORAGE_SET";
pub const STORAGE_GET: &str = "STORAGE_GET";
pub const STORAGE_REMOVE: &str = "STORAGE_REMOVE";

// Payments
pub const CREATE_INVOICE_SPARKS: &str = "CREATE_INVOICE_SPARKS";

// Solana wallet
pub const GET_SOLANA_ADDRESS: &str = "GET_SOLANA_ADDRESS";
pub const GET_SOLANA_BALANCE: &str = "GET_SOLANA_BALANCE";
pub const GET_TOKEN_BALANCE: &str = "GET_TOKEN_BALANCE";
pub const SOLANA_PAYMENT_REQUEST: &str = "SOLANA_PAYMENT_REQUEST";
pub const SOLANA_CREATE_TOKEN: &str = "SOLANA_CREATE_TOKEN";
pub const SOLANA_MINT_NFT: &str = "SOLANA_MINT_NFT";
pub const SOLANA_SIGN_MESSAGE: &str = "SOLANA_SIGN_MESSAGE";
pub const SOLANA_EXECUTE_CONTRACT: &str = "SOLANA_EXECUTE_CONTRACT";
