pub mod alphavantage;
pub mod binance;
pub mod coingecko;
pub mod coinmarketcap;
pub mod polygon;
pub mod yahoofinance;
