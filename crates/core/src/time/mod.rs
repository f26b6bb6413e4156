pub mod trading_days;
