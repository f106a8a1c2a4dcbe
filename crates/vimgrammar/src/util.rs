#[allow(unused_macros)]
macro_rules! key {
    ($ch: literal) => {
        $crate::key::KeyToken::from($ch)
    };
    ($kc: expr) => {
        $crate::key::KeyToken::from($kc)
    };
    ($kc: expr, $km: expr) => {
        $crate::key::KeyToken::new($kc, $km)
    };
}

#[allow(unused_macros)]
macro_rules! ctl {
    ($ch: literal) => {
        key!(
            $crate::key::KeyCode::Char($ch.to_ascii_lowercase()),
            $crate::key::KeyModifiers::CONTROL
        )
    };
}

#[allow(unused_macros)]
macro_rules! keys {
    ($ss: expr) => {
        <$crate::key::KeyToken as keytrie::InputKey>::from_macro_str($ss).unwrap()
    };
}

#[allow(unused_macros)]
macro_rules! strs {
    ( $( $ss: expr ),* ) => {
        vec![ $( String::from($ss), )* ]
    };
}
